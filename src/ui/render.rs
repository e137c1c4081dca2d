//! Plain-text rendering of a [`ViewSnapshot`].

use std::fmt::Write;

use crate::managers::view_controller::{Screen, ViewSnapshot};

pub const APP_TITLE: &str = "📚 Smart Bookmark";
pub const EMPTY_LIST: &str = "No bookmarks added yet.";

/// `google` -> `Google`
pub fn provider_label(provider: &str) -> String {
    let mut chars = provider.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render(view: &ViewSnapshot, provider: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", APP_TITLE);

    match &view.screen {
        Screen::Unauthenticated => {
            let _ = writeln!(out, "[login] Login with {}", provider_label(provider));
        }
        Screen::Authenticated { identity, bookmarks } => {
            let _ = writeln!(out, "Signed in as {}  [logout]", identity.label());
            let _ = writeln!(out);
            let _ = writeln!(out, "URL:   {}", view.form.url);
            let _ = writeln!(out, "Title: {}", view.form.title);
            let _ = writeln!(out);
            let _ = writeln!(out, "Your Bookmarks");
            if bookmarks.is_empty() {
                let _ = writeln!(out, "  {}", EMPTY_LIST);
            }
            for (n, bookmark) in bookmarks.iter().enumerate() {
                let _ = writeln!(out, "  {:>2}. {}", n + 1, bookmark.display_title());
                let _ = writeln!(out, "      {}  (id {})", bookmark.url, bookmark.id);
            }
        }
    }

    if let Some(notice) = view.notice {
        let _ = writeln!(out);
        let _ = writeln!(out, "! {}", notice.message());
    }
    out
}
