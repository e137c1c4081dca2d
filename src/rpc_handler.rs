//! RPC method handler for the Smart Bookmark JSON-RPC bridge.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` maps each method onto a [`ViewController`] action and
//! answers with the resulting view snapshot where that is useful.

use std::time::Instant;

use serde_json::{json, Value};

use crate::managers::view_controller::ViewController;

/// Request budget of the bridge; requests beyond it are answered with an error.
pub const MAX_REQUESTS_PER_SECOND: u32 = 200;

/// Fixed one-second window request counter.
pub struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    pub fn new(max_per_second: u32) -> Self {
        Self {
            window_start: Instant::now(),
            request_count: 0,
            max_per_second,
        }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    pub fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

/// Methods that may wait on the user (the browser sign-in) and so run beside
/// the request stream. Every other method is handled in arrival order.
pub fn runs_detached(method: &str) -> bool {
    method == "session.login"
}

fn view_json(view: &ViewController) -> Result<Value, String> {
    serde_json::to_value(view.snapshot()).map_err(|e| e.to_string())
}

fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// Applies the optional `url` / `title` params to the entry form.
fn apply_form(view: &ViewController, params: &Value) {
    if let Some(url) = str_param(params, "url") {
        view.set_url(url);
    }
    if let Some(title) = str_param(params, "title") {
        view.set_title(title);
    }
}

/// Dispatch a JSON-RPC method call to the view.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(view: &ViewController, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),
        "view.get" => view_json(view),

        // ─── Session ───
        "session.login" => {
            let state = view.login().await;
            Ok(json!({"session": state, "view": view_json(view)?}))
        }
        "session.logout" => {
            view.logout().await;
            view_json(view)
        }

        // ─── Form ───
        "form.set" => {
            apply_form(view, params);
            view_json(view)
        }

        // ─── Bookmarks ───
        "bookmark.save" => {
            apply_form(view, params);
            view.save().await.map_err(|e| e.to_string())?;
            view_json(view)
        }
        "bookmark.delete" => {
            let id = match params.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => return Err("missing id".to_string()),
            };
            view.delete(&id).await.map_err(|e| e.to_string())?;
            view_json(view)
        }
        "bookmark.refresh" => {
            view.refresh().await.map_err(|e| e.to_string())?;
            view_json(view)
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
