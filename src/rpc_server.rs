//! Smart Bookmark RPC Server: JSON-RPC over stdin/stdout for external UI shells.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.save", "params":{"url":"...","title":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Events:   {"event":"ready","version":"..."} once, then {"event":"view","view":{...}}
//!           whenever the view changes.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use smart_bookmark::app::App;
use smart_bookmark::config::AppConfig;
use smart_bookmark::managers::view_controller::ViewController;
use smart_bookmark::rpc_handler::{handle_method, runs_detached, RateLimiter, MAX_REQUESTS_PER_SECOND};

#[derive(Parser, Debug)]
#[command(name = "smart-bookmark-rpc", version)]
#[command(about = "JSON-RPC bridge to a Smart Bookmark view", long_about = None)]
struct RpcCli {
    #[arg(short = 'c', long = "config")]
    config_path: Option<PathBuf>,

    /// Run against an in-memory backend
    #[arg(long)]
    demo: bool,
}

async fn respond(view: &ViewController, id: Value, method: &str, params: &Value) -> Value {
    match handle_method(view, method, params).await {
        Ok(val) => json!({"id": id, "result": val}),
        Err(err) => json!({"id": id, "error": err}),
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    let cli = RpcCli::parse();
    let app = if cli.demo {
        App::demo().await.0
    } else {
        let config = AppConfig::load(cli.config_path.as_deref()).unwrap_or_else(|e| {
            println!("{}", json!({"event": "error", "error": e.to_string()}));
            process::exit(2);
        });
        App::connect(&config).await.unwrap_or_else(|e| {
            println!("{}", json!({"event": "error", "error": e.to_string()}));
            process::exit(2);
        })
    };
    let view = Arc::new(app.mount_view());

    // Single writer so responses and events never interleave mid-line.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = out_rx.recv().await {
            let line = format!("{}\n", message);
            if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                break;
            }
        }
    });

    let _ = out_tx.send(json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    let mut snapshots = view.snapshots();
    let events_tx = out_tx.clone();
    let events = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if events_tx.send(json!({"event": "view", "view": snapshot})).is_err() {
                break;
            }
        }
    });

    let mut rate_limiter = RateLimiter::new(MAX_REQUESTS_PER_SECOND);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let _ = out_tx.send(json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };
        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            let _ = out_tx.send(json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let params = req.get("params").cloned().unwrap_or(json!({}));

        if runs_detached(&method) {
            let view = Arc::clone(&view);
            let tx = out_tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(respond(&view, id, &method, &params).await);
            });
        } else {
            let _ = out_tx.send(respond(&view, id, &method, &params).await);
        }
    }

    view.unmount();
    events.abort();
    drop(out_tx);
    // A login still waiting on the browser keeps a sender alive; don't wait on it forever.
    let _ = tokio::time::timeout(Duration::from_secs(1), writer).await;
}
