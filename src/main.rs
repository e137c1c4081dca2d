//! `smart-bookmark`: console and one-shot commands.

use std::process;

use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, EnvFilter};

use smart_bookmark::app::App;
use smart_bookmark::config::{AppConfig, Cli, Command};
use smart_bookmark::managers::bookmark_repository::BookmarkRepositoryTrait;
use smart_bookmark::types::identity::Identity;
use smart_bookmark::ui::console::run_console;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

async fn run_shell(app: &App) -> CliResult {
    let view = app.mount_view();
    run_console(&view, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    view.unmount();
    Ok(())
}

fn signed_in(app: &App) -> Result<Identity, Box<dyn std::error::Error>> {
    app.session
        .current()
        .identity()
        .cloned()
        .ok_or_else(|| "Not signed in. Run `smart-bookmark login` first.".into())
}

async fn run(app: &App, command: Command) -> CliResult {
    match command {
        Command::Shell | Command::Demo => run_shell(app).await?,
        Command::Login => {
            let state = app.session.login_with_provider().await?;
            if let Some(identity) = state.identity() {
                println!("Signed in as {}", identity.label());
            }
        }
        Command::Logout => {
            // The local session is gone even when the provider call fails.
            if let Err(e) = app.session.logout().await {
                eprintln!("warning: {}", e);
            }
            println!("Signed out");
        }
        Command::Whoami => {
            let identity = signed_in(app)?;
            println!("{} ({})", identity.label(), identity.id);
        }
        Command::List => {
            let identity = signed_in(app)?;
            let bookmarks = app.repository.list(&identity.id).await?;
            if bookmarks.is_empty() {
                println!("No bookmarks added yet.");
            }
            for bookmark in bookmarks {
                println!("{}\t{}\t{}", bookmark.id, bookmark.display_title(), bookmark.url);
            }
        }
        Command::Add { url, title } => {
            let identity = signed_in(app)?;
            app.repository.create(&identity.id, &url, title.as_deref()).await?;
            println!("Saved {}", url);
        }
        Command::Delete { id } => {
            signed_in(app)?;
            app.repository.delete(&id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Shell);

    let app = if command == Command::Demo {
        let (app, _backend) = App::demo().await;
        app
    } else {
        let config = AppConfig::load(cli.config_path.as_deref()).unwrap_or_else(|e| {
            eprintln!("error: {}", e);
            process::exit(2);
        });
        App::connect(&config).await.unwrap_or_else(|e| {
            eprintln!("error: {}", e);
            process::exit(2);
        })
    };

    if let Err(e) = run(&app, command).await {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
