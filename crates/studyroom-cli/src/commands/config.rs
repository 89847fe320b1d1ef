use clap::Subcommand;
use serde_json::json;
use studyroom_core::{Config, ConfigError};

use super::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value by dot path
    Get {
        /// Config key (e.g. "energy.tick_regen", "integrity.max_frames_while_hidden")
        key: String,
    },
    /// Change one value by dot path and save
    Set {
        /// Config key
        key: String,
        /// New value, parsed as the key's type
        value: String,
    },
    /// Print the whole configuration
    List {
        /// JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
    /// Overwrite the file with defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key).ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            let stored = config.get(&key).unwrap_or(value);
            println!("{}", json!({ "key": key, "value": stored }));
        }
        ConfigAction::List { json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
