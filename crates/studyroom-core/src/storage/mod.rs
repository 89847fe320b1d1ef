mod config;
pub mod database;
pub mod record;
pub mod store;

pub use config::{Config, EnergyConfig, IntegrityConfig, ScoringConfig, TimingConfig, UserConfig};
pub use database::Database;
pub use record::{Progress, SessionRecord, UserId};
pub use store::{MemoryStore, RecordStore};

use std::path::PathBuf;

/// Returns the data directory.
///
/// `STUDYROOM_DATA_DIR` wins when set. Otherwise `~/.config/studyroom[-dev]/`
/// based on `STUDYROOM_ENV` (set it to `dev` for the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("STUDYROOM_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYROOM_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studyroom-dev")
            } else {
                base_dir.join("studyroom")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
