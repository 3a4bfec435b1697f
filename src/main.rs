mod config;
mod error;
mod homework;
mod poller;
mod practicum;
mod telegram;
mod validate;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use config::{Config, Credentials};
use poller::Poller;
use practicum::PracticumClient;
use telegram::TelegramBot;

#[derive(Parser)]
#[command(
    name = "homework-bot",
    version,
    about = "Forwards homework review status changes to Telegram"
)]
struct Cli {
    #[arg(short, long, default_value = "~/.homework-bot/config.toml")]
    config: String,
    /// Practicum API token
    #[arg(long, env = "PRACTICUM_TOKEN", hide_env_values = true)]
    practicum_token: Option<String>,
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,
    /// Chat that receives notifications
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll forever (default)
    Run,
    /// Run a single cycle and exit
    Once {
        /// Cursor to query from (defaults to now)
        #[arg(long)]
        from_date: Option<i64>,
    },
    /// Write a config template
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before clap reads `env = ...` arguments.
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Ignoring unreadable .env file: {e}");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Some(Commands::Init) => {
            if config::init_config(&cli.config).await? {
                tracing::info!("Wrote {}", cli.config);
            } else {
                tracing::info!("{} already exists, left untouched", cli.config);
            }
        }
        Some(Commands::Once { from_date }) => {
            let mut poller = build_poller(&cli, *from_date)?;
            let report = poller.run_cycle().await?;
            println!("{}", report.cursor);
        }
        Some(Commands::Run) | None => {
            let mut poller = build_poller(&cli, None)?;
            poller.run().await;
        }
    }
    Ok(())
}

fn build_poller(cli: &Cli, from_date: Option<i64>) -> Result<Poller> {
    let settings = config::load(&cli.config)?;
    let cfg = Config::build(
        settings,
        Credentials {
            practicum_token: cli.practicum_token.clone(),
            telegram_token: cli.telegram_token.clone(),
            telegram_chat_id: cli.telegram_chat_id.clone(),
        },
    )?;
    tracing::debug!("Loaded {cfg:?}");

    let source = Arc::new(PracticumClient::new(&cfg)?);
    let bot = Arc::new(TelegramBot::new(&cfg)?);
    let cursor = from_date.unwrap_or_else(|| chrono::Utc::now().timestamp());
    Ok(Poller::new(source, bot, cursor, cfg.retry_period))
}
