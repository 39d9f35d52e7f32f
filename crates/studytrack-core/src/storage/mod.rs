mod config;
pub mod database;
mod kv;
mod snapshot;

pub use config::{
    Config, MeditationConfig, NotificationsConfig, TickerConfig, Tool, ToolConfig, ToolsConfig,
};
pub use database::{Database, SessionRecord, Stats};
pub use kv::{KvStore, MemoryStore};
pub use snapshot::TimerStore;

use std::path::PathBuf;

/// Returns the StudyTrack data directory, creating it if needed.
///
/// `STUDYTRACK_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/studytrack[-dev]/`, with `STUDYTRACK_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("STUDYTRACK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYTRACK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studytrack-dev")
            } else {
                base_dir.join("studytrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
