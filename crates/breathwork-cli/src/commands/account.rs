use breathwork_core::Config;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::Serialize;

#[derive(Subcommand)]
pub enum AccountAction {
    /// Mark the account as subscribed
    Subscribe,
    /// Clear the subscription flag
    Unsubscribe,
    /// Start the free trial (once)
    StartTrial,
    /// Print subscription and trial state as JSON
    Status,
}

#[derive(Serialize)]
struct Status {
    subscribed: bool,
    trial_started_at: Option<DateTime<Utc>>,
    trial_ends_at: Option<DateTime<Utc>>,
    trial_active: bool,
    premium: bool,
}

pub fn run(action: AccountAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let now = Utc::now();

    match action {
        AccountAction::Subscribe => {
            config.account.subscribed = true;
            config.save()?;
            println!("subscribed");
        }
        AccountAction::Unsubscribe => {
            config.account.subscribed = false;
            config.save()?;
            println!("unsubscribed");
        }
        AccountAction::StartTrial => {
            if !config.account.start_trial(now) {
                return Err("trial already started".into());
            }
            config.save()?;
            match config.account.trial_ends_at() {
                Some(end) => println!("trial started, ends {}", end.to_rfc3339()),
                None => println!("trial started"),
            }
        }
        AccountAction::Status => {
            let account = &config.account;
            let status = Status {
                subscribed: account.subscribed,
                trial_started_at: account.trial_started_at,
                trial_ends_at: account.trial_ends_at(),
                trial_active: account.trial_active(now),
                premium: account.has_premium_access(now),
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
