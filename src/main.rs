mod app;
mod clock;
mod config;
mod devmenu;
mod eggs;
mod gpio;
mod grid;
mod input;
mod model;
mod render;
mod sim;
mod storage;

use anyhow::Result;
use clap::Parser;
use std::{fs::OpenOptions, path::Path, process::ExitCode, sync::Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::devmenu::{DevMenu, Sudo, EXIT_OK};
use crate::render::TerminalFrontend;
use crate::storage::SaveStore;

const LOG_ENV: &str = "POCKET_FRIENDS_LOG";

#[derive(Parser, Debug)]
#[command(name = "pocket_friends", version)]
#[command(about = "A small virtual pet for the terminal and the Raspberry Pi", long_about = None)]
struct Args {
    /// Delete the save file before starting
    #[arg(short = 'D', long)]
    delete_save: bool,

    /// Size of the game screen in pixels (overrides settings.json)
    #[arg(short, long)]
    size: Option<u32>,

    /// Open the on-device dev menu instead of the game
    #[arg(long, default_value_t = false)]
    dev: bool,
}

/// Logs go to a file since the terminal belongs to the game. Without a
/// writable file there is no logging at all.
fn init_tracing(path: &Path) {
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .try_init();
}

/// Removes the save file and returns the message for the user, who only
/// sees it once the game has left the alternate screen.
fn delete_save(store: &SaveStore) -> Result<&'static str> {
    let msg = if store.delete()? {
        "Save file deleted."
    } else {
        "Save file does not exist, cannot delete."
    };
    info!(path = %store.path().display(), "{msg}");
    Ok(msg)
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let paths = config::project_paths()?;
    init_tracing(&paths.log_path);

    let mut settings = config::load_settings(&paths.settings_path);
    if !paths.settings_path.exists() {
        if let Err(e) = config::save_settings_atomic(&paths.settings_path, &settings) {
            warn!("could not write default settings: {e:#}");
        }
    }
    if let Some(size) = args.size {
        settings.screen_size = size;
    }

    let store = SaveStore::new(&paths.save_path);
    let deleted = if args.delete_save {
        Some(delete_save(&store)?)
    } else {
        None
    };
    info!(save = %store.path().display(), dev = args.dev, "starting");

    let mut buttons = gpio::detect();
    let mut frontend = TerminalFrontend::begin(settings.screen_size)?;
    let res = if args.dev {
        DevMenu::new(
            &settings,
            paths.save_path.clone(),
            buttons.as_mut(),
            &mut frontend,
            &mut Sudo,
        )
        .run()
    } else {
        App::new(&settings, store, buttons.as_mut(), &mut frontend)
            .run()
            .map(|_| EXIT_OK)
    };

    // the terminal is restored even when the run failed
    let restored = frontend.end();
    if let Some(msg) = deleted {
        println!("{msg}");
    }
    let code = res?;
    restored?;
    Ok(ExitCode::from(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cli_flags() {
        let a = Args::parse_from(["pocket_friends", "--delete-save", "--size", "320"]);
        assert!(a.delete_save);
        assert_eq!(a.size, Some(320));
        assert!(!a.dev);
        let a = Args::parse_from(["pocket_friends", "-D", "--dev"]);
        assert!(a.delete_save && a.dev);
        assert_eq!(a.size, None);
    }

    #[test]
    fn delete_save_reports_both_outcomes() {
        let tmp = TempDir::new().unwrap();
        let store = SaveStore::new(tmp.path().join("save.json"));
        assert_eq!(
            delete_save(&store).unwrap(),
            "Save file does not exist, cannot delete."
        );
        store.save(&model::SaveRecord::default()).unwrap();
        assert_eq!(delete_save(&store).unwrap(), "Save file deleted.");
        assert!(!store.path().exists());
    }

    #[test]
    fn tracing_init_is_repeatable() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("pocket_friends.log");
        init_tracing(&log);
        init_tracing(&log);
        assert!(log.exists());
        // an unopenable path just leaves logging off
        init_tracing(&tmp.path().join("missing").join("x.log"));
    }
}
