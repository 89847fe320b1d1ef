//! Cosmetic selection commands.
//!
//! Equipping goes through the same redemption path as `stats redeem`, so a
//! purchase that the score cannot cover changes nothing.

use clap::Subcommand;
use serde_json::json;
use studyroom_core::{Command, Config, CosmeticSlot, ValidationError};

use super::{apply_and_save, load_session, open_sync, resolve_user, CliResult};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Equip a skin
    Skin {
        /// Skin name (e.g. "shop2.png")
        name: String,
        /// Points the skin costs
        #[arg(long, default_value_t = 0)]
        cost: u32,
        /// User id (defaults to user.id from the config)
        #[arg(long)]
        user: Option<String>,
    },
    /// Equip a background
    Background {
        /// Background name (e.g. "classroom2.jpg")
        name: String,
        /// Points the background costs
        #[arg(long, default_value_t = 0)]
        cost: u32,
        /// User id (defaults to user.id from the config)
        #[arg(long)]
        user: Option<String>,
    },
}

pub fn run(action: ProfileAction) -> CliResult {
    let (slot, name, cost, user) = match action {
        ProfileAction::Skin { name, cost, user } => (CosmeticSlot::Skin, name, cost, user),
        ProfileAction::Background { name, cost, user } => {
            (CosmeticSlot::Background, name, cost, user)
        }
    };
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "name".into(),
            message: "must not be empty".into(),
        }
        .into());
    }

    let config = Config::load()?;
    let user = resolve_user(user, &config)?;
    let sync = open_sync()?;
    let mut session = load_session(user, &config, &sync);

    let available = session.progress().score.points();
    let events = apply_and_save(
        &mut session,
        &sync,
        Command::Equip {
            slot,
            item: name,
            cost,
        },
    )?;
    if events.is_empty() {
        return Err(ValidationError::InsufficientPoints { cost, available }.into());
    }

    let progress = session.progress();
    let out = json!({
        "skin": progress.current_skin,
        "background": progress.current_background,
        "score": progress.score.points(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
