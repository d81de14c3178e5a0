use chrono::{DateTime, Local};
use turnlog_core::context::{AppConfig, AppConfigExt};
use turnlog_core::merge::{ExportOutcome, GameSummary, SessionMerger};
use turnlog_core::session::GameIdentity;
use turnlog_core::watcher::ReplayWatcher;

/// Tail the game log until Ctrl-C or a session log cannot be written.
pub async fn watch(config: &AppConfig, from_start: bool) -> Result<(), String> {
    let mut watcher = ReplayWatcher::from_config(config, from_start);

    println!("Watching {}", config.log_path.display());
    println!("Waiting for data... (end a turn in game)");

    let result = tokio::select! {
        result = watcher.run(config.poll_interval()) => result.map_err(|e| e.to_string()),
        signal = tokio::signal::ctrl_c() => signal.map_err(|e| e.to_string()),
    };

    let totals = watcher.totals();
    println!(
        "Stopped: {} sessions, {} turns recorded, {} duplicates, {} discarded, {} malformed lines",
        totals.sessions_started,
        totals.turns_recorded,
        totals.duplicate_turns,
        totals.discarded,
        totals.malformed_lines,
    );
    result
}

/// Merge the latest (or given) game into the viewer script.
pub fn export(config: &AppConfig, game: Option<&str>) -> Result<(), String> {
    let merger = SessionMerger::new(&config.replays_dir);
    let game = game.map(GameIdentity::from_dir_name);

    match merger
        .export(game.as_ref(), &config.export_path)
        .map_err(|e| e.to_string())?
    {
        ExportOutcome::Written(summary) => {
            println!("Exported {} -> {}", summary.game, summary.output.display());
            println!(
                "{} turns from {} sessions ({} superseded turns, {} unreadable lines)",
                summary.turns,
                summary.stats.sessions,
                summary.stats.overwritten_turns,
                summary.stats.skipped_lines,
            );
        }
        ExportOutcome::NoGames => {
            println!("Nothing to export: no sessions in {}", config.replays_dir.display());
        }
        ExportOutcome::NoSessions(game) => println!("Nothing to export: {} has no sessions", game),
        ExportOutcome::NoHeader(game) => {
            println!("Nothing to export: no HEADER recorded for {}", game)
        }
    }
    Ok(())
}

pub fn list_games(config: &AppConfig) -> Result<(), String> {
    let merger = SessionMerger::new(&config.replays_dir);
    let games = merger.list_games().map_err(|e| e.to_string())?;

    if games.is_empty() {
        println!("No games in {}", config.replays_dir.display());
        return Ok(());
    }

    for game in &games {
        println!("{}", format_game(game));
    }
    Ok(())
}

fn format_game(game: &GameSummary) -> String {
    let newest: DateTime<Local> = game.newest.into();
    format!(
        "{:<50} {:>3} session{} last written {}",
        game.identity.as_str(),
        game.sessions,
        if game.sessions == 1 { "" } else { "s" },
        newest.format("%Y-%m-%d %H:%M:%S"),
    )
}

pub fn show_config(config: &AppConfig) -> Result<(), String> {
    match AppConfig::config_path() {
        Ok(path) => println!("# {}", path.display()),
        Err(e) => println!("# {e}"),
    }
    let text = toml::to_string_pretty(config).map_err(|e| e.to_string())?;
    print!("{text}");
    Ok(())
}

/// Persist `config` so later runs pick up the overrides.
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    config.save().map_err(|e| e.to_string())?;
    if let Ok(path) = AppConfig::config_path() {
        println!("Saved {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_format_game_pluralizes_sessions() {
        let game = GameSummary {
            identity: GameIdentity::from_dir_name("Rome"),
            dir: "replays/Rome".into(),
            sessions: 1,
            newest: SystemTime::UNIX_EPOCH + Duration::from_secs(86_400),
        };
        let line = format_game(&game);
        assert!(line.starts_with("Rome "));
        assert!(line.contains("  1 session last written"));

        let many = GameSummary { sessions: 3, ..game };
        assert!(format_game(&many).contains("  3 sessions last written"));
    }
}
