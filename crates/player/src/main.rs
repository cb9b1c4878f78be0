//! Gambit Player - console composition root.
//!
//! Joins one game over the session engine, prints every published view and
//! reads moves and navigation commands from stdin.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use gambit_domain::{GameId, GameStatus, PlayerColor, UserId};
use gambit_player::{
    ChessRulesEngine, ClientConfig, SessionContext, SessionHandle, SessionService, SessionView,
    StaticTokenAuth,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod console;

use console::{describe, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root so `cargo run -p gambit-player` picks up `.env`.
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gambit_player=debug,gambit_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Gambit Player");

    let config = ClientConfig::from_env();
    let token = std::env::var("GAMBIT_TOKEN").context("GAMBIT_TOKEN must be set")?;
    let game_id: GameId = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GAMBIT_GAME_ID").ok())
        .context("pass a game id as the first argument or set GAMBIT_GAME_ID")?
        .parse()
        .context("invalid game id")?;
    let color: PlayerColor = std::env::var("GAMBIT_COLOR")
        .unwrap_or_default()
        .parse()
        .context("invalid GAMBIT_COLOR")?;
    let status: GameStatus = match std::env::var("GAMBIT_GAME_STATUS") {
        Ok(raw) => raw.parse().context("invalid GAMBIT_GAME_STATUS")?,
        Err(_) => GameStatus::Playing,
    };
    let json_output = std::env::var("GAMBIT_OUTPUT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let mut ctx = SessionContext::new(game_id, color).with_status(status);
    if let Ok(raw) = std::env::var("GAMBIT_USER_ID") {
        let user_id: UserId = raw.parse().context("invalid GAMBIT_USER_ID")?;
        ctx = ctx.with_user(user_id);
    }

    tracing::info!(
        game_id = %game_id,
        color = %color,
        ws_url = %config.ws_url,
        "Joining game"
    );

    let handle = SessionService::start(
        ctx,
        config,
        Arc::new(ChessRulesEngine::new()),
        Arc::new(StaticTokenAuth::new(token)),
    );

    let result = run_console(&handle, json_output).await;
    handle.close("player quit").await?;
    result
}

async fn run_console(handle: &SessionHandle, json_output: bool) -> anyhow::Result<()> {
    let mut views = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    render(&views.borrow_and_update().clone(), json_output)?;

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                render(&view, json_output)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = dispatch(handle, command, json_output).await {
                            eprintln!("{}", e);
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn dispatch(handle: &SessionHandle, command: Command, json_output: bool) -> anyhow::Result<()> {
    match command {
        Command::Move(notation) => {
            handle.submit_notation(notation).await?;
        }
        Command::Cells {
            from,
            to,
            promotion,
        } => {
            handle.submit_move(from, to, promotion).await?;
        }
        Command::Back => handle.step_back().await?,
        Command::Forward => handle.step_forward().await?,
        Command::Live => handle.jump_to_live().await?,
        Command::Jump(index) => handle.jump_to(index).await?,
        Command::Show => render(&handle.view(), json_output)?,
        Command::Quit => {}
    }
    Ok(())
}

fn render(view: &SessionView, json_output: bool) -> anyhow::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string(view)?);
    } else {
        println!("{}", describe(view));
        println!("  {}", view.viewed_position);
    }
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");

    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
