use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use client::config::DEFAULT_API_URL;
use client::net::api::fetch_remaining_cooldown;
use client::net::snapshot::fetch_snapshot;
use client::raster::Raster;
use client::{CanvasApi, ClientConfig, ClientError, HttpApi, LiveCanvas, PixelRequest, PixelUpdate};
use serde_json::Value;
use session::{FileSessionStore, Session, SessionKey, SessionStore};
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("no session; run `pixel login <username>` or pass --session-token")]
    MissingSession,
    #[error("session error: {0}")]
    Session(#[from] session::SessionError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed with HTTP {0}")]
    Unhealthy(u16),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "pixel", about = "Live pixel canvas client")]
struct Cli {
    #[arg(long, env = "PIXEL_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Realtime base URL; derived from --api-url when unset.
    #[arg(long, env = "PIXEL_WS_URL")]
    ws_url: Option<String>,

    #[arg(long, env = "PIXEL_SESSION_TOKEN")]
    session_token: Option<String>,

    #[arg(long, env = "PIXEL_SESSION_FILE", default_value = ".pixel-session")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the server's health endpoint.
    Ping,
    /// Mint a session token (needs SESSION_SECRET) and store it.
    Login {
        username: String,
        #[arg(long, default_value_t = 24)]
        ttl_hours: u64,
    },
    /// Forget the stored session.
    Logout,
    /// Show the stored session.
    Whoami,
    /// Print the whole canvas as JSON.
    Snapshot,
    /// Seconds until a player may place again.
    Cooldown {
        /// Defaults to the session's username.
        player: Option<String>,
    },
    /// Place one pixel as the session's player.
    Place { x: u32, y: u32, color: String },
    /// Follow the canvas live, printing status and updates.
    Watch {
        /// Stop after this many seconds.
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Download the canvas as a PNG, 10 px per cell.
    Export { path: PathBuf },
}

#[derive(Debug)]
struct CliContext {
    config: ClientConfig,
    store: FileSessionStore,
    session_token: Option<String>,
}

impl CliContext {
    /// Explicit token first, then the session file.
    fn token(&self) -> Option<String> {
        self.session_token.clone().or_else(|| self.store.load())
    }

    /// Token plus the username it claims.
    fn session(&self) -> Result<(String, Session), CliError> {
        let token = self.token().ok_or(CliError::MissingSession)?;
        let session = session::read_unverified(&token)?;
        if session.is_expired(session::now_ms()) {
            return Err(CliError::Session(session::SessionError::Expired { expires_at: session.expires_at }));
        }
        Ok((token, session))
    }

    fn api(&self, token: Option<&str>) -> Result<HttpApi, CliError> {
        Ok(HttpApi::new(&self.config, token)?)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let ctx = CliContext {
        config: client_config(&cli.api_url, cli.ws_url.as_deref())?,
        store: FileSessionStore::new(cli.session_file),
        session_token: cli.session_token,
    };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Login { username, ttl_hours } => run_login(&ctx, &username, ttl_hours),
        Command::Logout => {
            ctx.store.purge();
            println!("logged out");
            Ok(())
        }
        Command::Whoami => run_whoami(&ctx),
        Command::Snapshot => run_snapshot(&ctx).await,
        Command::Cooldown { player } => run_cooldown(&ctx, player).await,
        Command::Place { x, y, color } => run_place(&ctx, x, y, &color).await,
        Command::Watch { seconds } => run_watch(&ctx, seconds).await,
        Command::Export { path } => run_export(&ctx, path).await,
    }
}

/// Environment settings with the URL flags applied on top.
fn client_config(api_url: &str, ws_url: Option<&str>) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    let mut urls = ClientConfig::new(api_url);
    if let Some(ws_url) = ws_url {
        urls = urls.with_ws_url(ws_url);
    }
    config.api_url = urls.api_url;
    config.ws_url = urls.ws_url;
    config.validate()?;
    Ok(config)
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_ping(ctx: &CliContext) -> Result<(), CliError> {
    let url = format!("{}/healthz", ctx.config.api_url);
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

fn run_login(ctx: &CliContext, username: &str, ttl_hours: u64) -> Result<(), CliError> {
    let key = SessionKey::from_env()?;
    let ttl = Duration::from_secs(ttl_hours.saturating_mul(3600));
    let session = Session::start(username, session::now_ms(), ttl)?;
    let token = key.issue(&session)?;
    ctx.store.save(&token);
    tracing::info!(username = %session.username, path = %ctx.store.path().display(), "session stored");
    println!("logged in as {}", session.username);
    Ok(())
}

fn run_whoami(ctx: &CliContext) -> Result<(), CliError> {
    // With the secret available the token is verified (and purged if bad).
    let session = match SessionKey::from_env() {
        Ok(key) => session::current_session(&ctx.store, &key, session::now_ms()).ok_or(CliError::MissingSession)?,
        Err(_) => ctx.session()?.1,
    };
    print_json(&serde_json::to_value(&session)?)
}

async fn run_snapshot(ctx: &CliContext) -> Result<(), CliError> {
    let api = ctx.api(None)?;
    let state = fetch_snapshot(&api, ctx.config.snapshot_retry, ctx.config.grid).await;
    print_json(&serde_json::to_value(state.to_snapshot())?)
}

async fn run_cooldown(ctx: &CliContext, player: Option<String>) -> Result<(), CliError> {
    let player = match player {
        Some(player) => player,
        None => ctx.session()?.1.username,
    };
    let api = ctx.api(None)?;
    let remaining = fetch_remaining_cooldown(&api, &player).await;
    println!("{remaining}");
    Ok(())
}

async fn run_place(ctx: &CliContext, x: u32, y: u32, color: &str) -> Result<(), CliError> {
    let grid = ctx.config.grid;
    if !grid.contains(x, y) {
        return Err(ClientError::OutOfBounds { x, y, width: grid.width, height: grid.height }.into());
    }
    let (token, session) = ctx.session()?;
    let api = ctx.api(Some(&token))?;
    let ack = api.submit_pixel(&PixelRequest::new(x, y, color, &session.username)).await?;
    print_json(&serde_json::to_value(ack)?)
}

async fn run_watch(ctx: &CliContext, seconds: Option<u64>) -> Result<(), CliError> {
    // Watching works anonymously; a session only names the player.
    let (token, player) = match ctx.session() {
        Ok((token, session)) => (Some(token), session.username),
        Err(_) => (None, String::new()),
    };
    let api: Arc<dyn CanvasApi> = Arc::new(ctx.api(token.as_deref())?);
    let live = LiveCanvas::start(&ctx.config, api, &player)?;
    let mut view = live.subscribe();
    let mut updates = live.updates();

    let deadline = seconds.map(|s| tokio::time::Instant::now() + Duration::from_secs(s));
    let mut printed = Printed::default();

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update();
                for line in printed.diff(&current) {
                    println!("{line}");
                }
            }
            update = updates.recv() => match update {
                Ok(update) => println!("{}", pixel_line(&update)),
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "watch: output fell behind; updates skipped"),
                Err(RecvError::Closed) => break,
            },
            _ = sleep_until(deadline) => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    live.shutdown();
    Ok(())
}

async fn run_export(ctx: &CliContext, path: PathBuf) -> Result<(), CliError> {
    let api = ctx.api(None)?;
    let state = fetch_snapshot(&api, ctx.config.snapshot_retry, ctx.config.grid).await;
    let mut raster = Raster::new(ctx.config.grid);
    raster.repaint(&state);
    raster.save_png(&path)?;
    println!("wrote {} ({} cells)", path.display(), state.len());
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

/// Session state `watch` has already reported. Pixels are printed from the
/// update stream, not from here.
#[derive(Debug, Default)]
struct Printed {
    status: Option<client::ConnectionStatus>,
    notice: Option<String>,
    loaded: bool,
}

impl Printed {
    /// Lines describing what changed since the last call.
    fn diff(&mut self, view: &client::CanvasView) -> Vec<String> {
        let mut lines = Vec::new();
        if self.status != Some(view.status) {
            self.status = Some(view.status);
            lines.push(format!("status: {}", view.status.label()));
        }
        if view.snapshot_loaded && !self.loaded {
            self.loaded = true;
            lines.push(format!("snapshot: {} cells", view.canvas.len()));
        }
        if view.notice != self.notice {
            self.notice.clone_from(&view.notice);
            if let Some(notice) = &view.notice {
                lines.push(format!("notice: {notice}"));
            }
        }
        lines
    }
}

fn pixel_line(update: &PixelUpdate) -> String {
    format!("pixel: ({}, {}) {} by {}", update.x, update.y, update.color, update.player)
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
