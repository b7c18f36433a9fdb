use std::sync::Arc;
use std::time::Duration;

use cartwatch_core::{
    Notification, NotificationCenter, NotificationPoller, PollerConfig, PreferencesStore,
};
use clap::Subcommand;

use super::api_client;

#[derive(Subcommand)]
pub enum NotificationsAction {
    /// List active notifications, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show aggregate counts for the active set
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a notification as read
    Read {
        /// Notification id
        id: String,
    },
    /// Dismiss a notification
    Dismiss {
        /// Notification id
        id: String,
    },
    /// Poll continuously and print summary updates until Ctrl-C
    Watch {
        /// Poll interval in milliseconds (defaults to the configured value)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

async fn build_center() -> Result<NotificationCenter, Box<dyn std::error::Error>> {
    let (config, api) = api_client()?;
    let prefs = Arc::new(PreferencesStore::new(api.clone()));
    if let Err(err) = prefs.load().await {
        eprintln!("warning: could not load preferences, using defaults: {err}");
    }
    Ok(NotificationCenter::new(api, prefs).with_retry_limit(config.sync.retry_limit))
}

fn print_notification(n: &Notification) {
    let read = if n.read { " " } else { "*" };
    println!(
        "{read} [{:?}] {}  {}  ({})",
        n.priority,
        n.created_at.format("%Y-%m-%d %H:%M"),
        n.title,
        n.id
    );
    if !n.message.is_empty() {
        println!("    {}", n.message);
    }
}

pub async fn run(action: NotificationsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        NotificationsAction::List { json } => {
            let center = build_center().await?;
            center.refresh().await?;
            let active = center.active();
            if json {
                println!("{}", serde_json::to_string_pretty(&active)?);
            } else if active.is_empty() {
                println!("no active notifications");
            } else {
                for n in &active {
                    print_notification(n);
                }
            }
        }
        NotificationsAction::Summary { json } => {
            let center = build_center().await?;
            let summary = center.refresh().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("active: {}", summary.total_active);
                for (priority, count) in summary.by_priority.iter().rev() {
                    if *count > 0 {
                        println!("  {priority:?}: {count}");
                    }
                }
            }
        }
        NotificationsAction::Read { id } => {
            let center = build_center().await?;
            center.refresh().await?;
            match center.mark_read(&id).await {
                Ok(()) => println!("ok"),
                Err(err @ cartwatch_core::CoreError::RemoteOutOfSync { .. }) => {
                    println!("ok (local only)");
                    eprintln!("warning: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
        NotificationsAction::Dismiss { id } => {
            let center = build_center().await?;
            center.refresh().await?;
            match center.dismiss(&id).await {
                Ok(()) => println!("ok"),
                Err(err @ cartwatch_core::CoreError::RemoteOutOfSync { .. }) => {
                    println!("ok (local only)");
                    eprintln!("warning: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
        NotificationsAction::Watch { interval_ms } => {
            let (config, api) = api_client()?;
            let prefs = Arc::new(PreferencesStore::new(api.clone()));
            if let Err(err) = prefs.load().await {
                eprintln!("warning: could not load preferences, using defaults: {err}");
            }
            let center =
                NotificationCenter::new(api, prefs).with_retry_limit(config.sync.retry_limit);

            let interval = interval_ms.unwrap_or(config.polling.interval_ms);
            let poller_config = PollerConfig::default()
                .with_interval(interval)
                .with_fetch_timeout(config.polling.fetch_timeout_ms);
            let mut poller = NotificationPoller::new(center.clone(), poller_config);
            poller.start();
            println!("watching (every {interval} ms); Ctrl-C to stop");

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = tokio::time::sleep(Duration::from_millis(interval)) => {
                        if center.suppressed_now() {
                            // Quiet hours: keep polling, stay silent.
                            continue;
                        }
                        let summary = center.summary();
                        println!(
                            "{} active ({} urgent, {} high)",
                            summary.total_active,
                            summary.priority_count(cartwatch_core::Priority::Urgent),
                            summary.priority_count(cartwatch_core::Priority::High),
                        );
                    }
                }
            }
            poller.stop();
        }
    }
    Ok(())
}
