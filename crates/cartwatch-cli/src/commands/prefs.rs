use std::path::PathBuf;
use std::sync::Arc;

use cartwatch_core::{NotificationPreferences, PreferencesStore, QuietHours};
use chrono::NaiveTime;
use clap::Subcommand;

use super::api_client;

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show the saved preference tree
    Show,
    /// Save a preference tree from a JSON file ("-" reads stdin)
    Save {
        /// JSON file path, or "-" for stdin
        file: PathBuf,
    },
    /// Toggle or reconfigure the quiet-hours window
    Quiet {
        /// "on", "off", or a window like "22:00-06:00"
        setting: String,
    },
}

async fn store() -> Result<Arc<PreferencesStore>, Box<dyn std::error::Error>> {
    let (_config, api) = api_client()?;
    let store = Arc::new(PreferencesStore::new(api));
    store.load().await?;
    Ok(store)
}

fn parse_quiet(setting: &str, current: QuietHours) -> Result<QuietHours, Box<dyn std::error::Error>> {
    match setting {
        "on" => Ok(QuietHours {
            enabled: true,
            ..current
        }),
        "off" => Ok(QuietHours {
            enabled: false,
            ..current
        }),
        window => {
            let (start, end) = window
                .split_once('-')
                .ok_or("expected 'on', 'off', or a window like 22:00-06:00")?;
            let start = NaiveTime::parse_from_str(start, "%H:%M")
                .map_err(|_| format!("invalid start time '{start}', expected HH:MM"))?;
            let end = NaiveTime::parse_from_str(end, "%H:%M")
                .map_err(|_| format!("invalid end time '{end}', expected HH:MM"))?;
            Ok(QuietHours {
                enabled: true,
                start,
                end,
            })
        }
    }
}

pub async fn run(action: PrefsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PrefsAction::Show => {
            let store = store().await?;
            println!("{}", serde_json::to_string_pretty(&store.current())?);
        }
        PrefsAction::Save { file } => {
            let text = if file.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(&file)?
            };
            let draft: NotificationPreferences = serde_json::from_str(&text)?;

            let store = store().await?;
            store.save(draft).await?;
            println!("preferences saved");
        }
        PrefsAction::Quiet { setting } => {
            let store = store().await?;
            let mut draft = store.current();
            draft.quiet_hours = parse_quiet(&setting, draft.quiet_hours)?;
            let saved = store.save(draft).await?;
            if saved.quiet_hours.enabled {
                println!(
                    "quiet hours on ({} - {})",
                    saved.quiet_hours.start.format("%H:%M"),
                    saved.quiet_hours.end.format("%H:%M")
                );
            } else {
                println!("quiet hours off");
            }
        }
    }
    Ok(())
}
