use clap::Subcommand;
use serde_json::json;
use studyroom_core::{Command, Config, ValidationError};

use super::{apply_and_save, load_session, open_sync, resolve_user, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Print stats, score, level and summary
    Show {
        /// User id (defaults to user.id from the config)
        #[arg(long)]
        user: Option<String>,
    },
    /// Spend points from the score
    Redeem {
        /// Points to spend
        cost: u32,
        /// User id (defaults to user.id from the config)
        #[arg(long)]
        user: Option<String>,
    },
}

pub fn run(action: StatsAction) -> CliResult {
    let config = Config::load()?;
    let sync = open_sync()?;

    match action {
        StatsAction::Show { user } => {
            let user = resolve_user(user, &config)?;
            let record = sync.load(&user);
            let progress = &record.progress;
            let out = json!({
                "user": user.as_str(),
                "score": progress.score.points(),
                "level": progress.score.level().label(),
                "stats": progress.stats,
                "summary": progress.stats.summarize(progress.score),
                "skin": progress.current_skin,
                "background": progress.current_background,
                "last_update": record.last_update,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        StatsAction::Redeem { cost, user } => {
            let user = resolve_user(user, &config)?;
            let mut session = load_session(user, &config, &sync);
            let available = session.progress().score.points();
            let events = apply_and_save(&mut session, &sync, Command::Redeem { cost })?;
            if events.is_empty() {
                return Err(ValidationError::InsufficientPoints { cost, available }.into());
            }
            let out = json!({
                "redeemed": cost,
                "score": session.progress().score.points(),
                "level": session.progress().score.level().label(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
