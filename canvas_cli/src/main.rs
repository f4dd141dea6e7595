use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use canvas_board::{BoardConfig, Canvas, PointerEvent, StrokeStyle, config};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use futures_util::{StreamExt, stream};
use spinners::{Spinner, Spinners};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod session;

use session::{Session, SessionStats, script_events};

// Where the relay listens by default.
const DEFAULT_RELAY_URL: &str = "ws://localhost:8080/canvas";

/// A CLI for drawing on a shared canvas.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Relay websocket URL, e.g. ws://localhost:8080/canvas or .../canvas/<room>
    /// (rooms other than the default are created with GET /create/<room>)
    #[arg(long, env = "CANVAS_RELAY_URL", default_value = DEFAULT_RELAY_URL, global = true)]
    relay_url: String,

    #[command(flatten)]
    board: BoardArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct BoardArgs {
    /// Board width in pixels.
    #[arg(long, default_value_t = config::DEFAULT_WIDTH, global = true)]
    width: u32,
    /// Board height in pixels.
    #[arg(long, default_value_t = config::DEFAULT_HEIGHT, global = true)]
    height: u32,
    /// Pen width in pixels.
    #[arg(long, default_value_t = config::DEFAULT_STROKE_WIDTH, global = true)]
    stroke_width: f32,
}

impl BoardArgs {
    fn to_config(&self) -> BoardConfig {
        BoardConfig {
            width: self.width,
            height: self.height,
            stroke: StrokeStyle {
                width: self.stroke_width,
                ..StrokeStyle::default()
            },
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a pointer script onto the board, sending each completed stroke.
    /// Example: printf 'down 10 10\nmove 50 50\nup\n' | canvas draw
    Draw {
        /// Script file with one `down X Y`, `move X Y` or `up` per line (stdin when omitted).
        #[arg(long, short)]
        script: Option<PathBuf>,
        /// Delay between events in milliseconds.
        #[arg(long, default_value_t = 0)]
        pace_ms: u64,
        /// Save the final board as PNG.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Apply boards drawn by others and report each one.
    Watch {
        /// Stop after this many boards.
        #[arg(long, short)]
        count: Option<NonZeroUsize>,
        /// Save the final board as PNG.
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canvas_cli=info,canvas_board=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.board.to_config();

    match cli.command {
        Commands::Draw {
            script,
            pace_ms,
            save,
        } => {
            let mut session = connect(&cli.relay_url, &config).await?;

            let pace = Duration::from_millis(pace_ms);
            let input = match script {
                Some(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("could not open script {}", path.display()))?;
                    script_events(BufReader::new(file), pace)
                }
                None => script_events(BufReader::new(tokio::io::stdin()), pace),
            };

            let result = session.run(input, |_, _| ControlFlow::Continue(())).await;
            session.close().await;
            result?;

            print_summary(&cli.relay_url, session.surface().canvas(), session.stats());
            if let Some(path) = save {
                save_png(session.surface().canvas(), &path).await?;
            }
        }
        Commands::Watch { count, save } => {
            let mut session = connect(&cli.relay_url, &config).await?;
            println!("Watching {} (Ctrl-C to stop)", cli.relay_url);

            let mut table = Table::new();
            table.set_header(vec!["#", "Received", "Size", "Inked pixels"]);

            let result = session
                .run(stream::pending::<anyhow::Result<PointerEvent>>().boxed(), |image, stats| {
                    info!(board = stats.boards_received, "board received");
                    table.add_row(vec![
                        stats.boards_received.to_string(),
                        Local::now().format("%H:%M:%S%.3f").to_string(),
                        format!("{}x{}", image.width(), image.height()),
                        image.inked_pixels().to_string(),
                    ]);
                    match count {
                        Some(n) if stats.boards_received >= n.get() => ControlFlow::Break(()),
                        _ => ControlFlow::Continue(()),
                    }
                })
                .await;
            session.close().await;
            result?;

            println!("{table}");
            if let Some(path) = save {
                save_png(session.surface().canvas(), &path).await?;
            }
        }
    }

    Ok(())
}

async fn connect(url: &str, config: &BoardConfig) -> anyhow::Result<Session> {
    let mut sp = Spinner::new(Spinners::Dots9, format!("Connecting to {url}..."));
    match Session::connect(url, config).await {
        Ok(session) => {
            sp.stop_with_message("✓ Connected to relay".into());
            Ok(session)
        }
        Err(e) => {
            sp.stop_with_message("✗ Could not reach the relay".into());
            Err(e)
        }
    }
}

fn print_summary(url: &str, canvas: &Canvas, stats: SessionStats) {
    let mut table = Table::new();
    table.set_header(vec!["Relay", "Board", "Strokes sent", "Boards received", "Inked pixels"]);
    table.add_row(vec![
        url.to_string(),
        format!("{}x{}", canvas.width(), canvas.height()),
        stats.strokes_sent.to_string(),
        stats.boards_received.to_string(),
        canvas.inked_pixels().to_string(),
    ]);
    println!("{table}");
}

async fn save_png(canvas: &Canvas, path: &Path) -> anyhow::Result<()> {
    let png = canvas.encode_png()?;
    tokio::fs::write(path, png)
        .await
        .with_context(|| format!("could not write {}", path.display()))?;
    println!("✓ Board saved to {}", path.display());
    Ok(())
}
