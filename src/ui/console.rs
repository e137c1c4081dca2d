//! Interactive console over a mounted [`ViewController`].
//!
//! Reads one command per line, runs it against the view and prints the
//! re-rendered screen. Blocking notices are shown once and then dismissed.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::managers::view_controller::ViewController;
use crate::types::bookmark::Bookmark;
use crate::types::errors::ViewError;
use crate::ui::render::render;

pub const HELP: &str = "\
Commands:
  login                 sign in with the OAuth provider
  logout                sign out
  url <text>            set the URL field
  title <text>          set the title field
  save                  save the form as a bookmark
  add <url> [title]     fill the form and save in one step
  delete <n|id>         delete by list position, or by id
  refresh               reload the list
  help                  show this help
  quit                  leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Login,
    Logout,
    Url(String),
    Title(String),
    Save,
    Add { url: String, title: Option<String> },
    Delete(String),
    Refresh,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parses one input line. `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "login" => Self::Login,
            "logout" => Self::Logout,
            "url" => Self::Url(rest.to_string()),
            "title" => Self::Title(rest.to_string()),
            "save" => Self::Save,
            "add" => {
                let (url, title) = match rest.split_once(char::is_whitespace) {
                    Some((url, title)) => (url, Some(title.trim().to_string())),
                    None => (rest, None),
                };
                Self::Add {
                    url: url.to_string(),
                    title: title.filter(|t| !t.is_empty()),
                }
            }
            "delete" | "rm" => {
                if rest.is_empty() {
                    return Err("usage: delete <n|id>".to_string());
                }
                Self::Delete(rest.to_string())
            }
            "refresh" | "ls" => Self::Refresh,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command '{}', type 'help'", other)),
        };
        Ok(Some(command))
    }
}

/// A number within the displayed list picks that row; anything else is an id.
pub fn resolve_delete_target(target: &str, shown: &[Bookmark]) -> String {
    match target.parse::<usize>() {
        Ok(n) if (1..=shown.len()).contains(&n) => shown[n - 1].id.clone(),
        _ => target.to_string(),
    }
}

fn describe(error: ViewError) -> String {
    match error {
        ViewError::MissingUrl => String::new(),
        ViewError::NotAuthenticated => "Not signed in. Type 'login' first.".to_string(),
    }
}

/// Runs the console until `quit` or end of input.
pub async fn run_console<R, W>(view: &ViewController, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(render(&view.snapshot(), view.provider()).as_bytes()).await?;
    output.write_all(b"\n> ").await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => {
                output.write_all(b"> ").await?;
                output.flush().await?;
                continue;
            }
            Err(message) => {
                output.write_all(format!("{}\n> ", message).as_bytes()).await?;
                output.flush().await?;
                continue;
            }
        };

        let outcome = match command {
            ConsoleCommand::Quit => break,
            ConsoleCommand::Help => {
                output.write_all(format!("{}\n> ", HELP).as_bytes()).await?;
                output.flush().await?;
                continue;
            }
            ConsoleCommand::Login => {
                view.login().await;
                Ok(())
            }
            ConsoleCommand::Logout => {
                view.logout().await;
                Ok(())
            }
            ConsoleCommand::Url(url) => {
                view.set_url(url);
                Ok(())
            }
            ConsoleCommand::Title(title) => {
                view.set_title(title);
                Ok(())
            }
            ConsoleCommand::Save => view.save().await,
            ConsoleCommand::Add { url, title } => {
                view.set_url(url);
                view.set_title(title.unwrap_or_default());
                view.save().await
            }
            ConsoleCommand::Delete(target) => {
                let id = resolve_delete_target(&target, view.snapshot().bookmarks());
                view.delete(&id).await
            }
            ConsoleCommand::Refresh => view.refresh().await,
        };

        let mut screen = render(&view.snapshot(), view.provider());
        if let Err(e) = outcome {
            let message = describe(e);
            if !message.is_empty() {
                screen.push_str(&message);
                screen.push('\n');
            }
        }
        view.dismiss_notice();

        output.write_all(screen.as_bytes()).await?;
        output.write_all(b"\n> ").await?;
        output.flush().await?;
    }

    output.write_all(b"\n").await?;
    output.flush().await
}
