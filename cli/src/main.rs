use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use turnlog_cli::commands;
use turnlog_cli::logging::init_logging;
use turnlog_core::context::{AppConfig, AppConfigExt};

#[derive(Parser)]
#[command(version, about = "Capture per-turn game state from the game log and export replays")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the stored configuration, applied to this run only.
#[derive(Args)]
struct Overrides {
    /// Game log to tail
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    /// Root directory for recorded sessions
    #[arg(long, global = true)]
    replays: Option<PathBuf>,
    /// Viewer script written by `export`
    #[arg(long, global = true)]
    output: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(log) = self.log {
            config.log_path = log;
        }
        if let Some(replays) = self.replays {
            config.replays_dir = replays;
        }
        if let Some(output) = self.output {
            config.export_path = output;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Tail the game log and record sessions until Ctrl-C
    Watch {
        /// Milliseconds between polls
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Read the whole existing log instead of starting at its end
        #[arg(long)]
        from_start: bool,
    },
    /// Merge the most recent game (or --game) into the viewer script
    Export {
        #[arg(short, long)]
        game: Option<String>,
    },
    /// List recorded games, most recent first
    Games,
    /// Show the effective configuration
    Config {
        /// Store the effective configuration, including overrides
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), String> {
    init_logging();

    let cli = Cli::parse();
    let mut config = AppConfig::load();
    cli.overrides.apply(&mut config);

    match cli.command {
        Commands::Watch {
            interval_ms,
            from_start,
        } => {
            if let Some(ms) = interval_ms {
                config.poll_interval_ms = ms;
            }
            commands::watch(&config, from_start).await
        }
        Commands::Export { game } => commands::export(&config, game.as_deref()),
        Commands::Games => commands::list_games(&config),
        Commands::Config { save } => {
            if save {
                commands::save_config(&config)?;
            }
            commands::show_config(&config)
        }
    }
}
