use std::io::Write;
use std::time::Duration;

use cartwatch_core::{AddOutcome, CandidateItem, RepurchaseGuard};
use clap::Subcommand;

use super::api_client;

#[derive(Subcommand)]
pub enum CartAction {
    /// Add an item, guarded against accidental repurchase
    Add {
        /// Item name
        name: String,
        /// Item category (e.g. "dairy", "produce")
        #[arg(long)]
        category: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long, default_value = "pieces")]
        unit: String,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        #[arg(long)]
        organic: bool,
        /// Commit without prompting if a repurchase warning fires
        #[arg(long)]
        yes: bool,
    },
}

fn prompt_confirm(message: &str) -> Result<bool, Box<dyn std::error::Error>> {
    eprint!("{message} [y/N] ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

pub async fn run(action: CartAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CartAction::Add {
            name,
            category,
            quantity,
            unit,
            price,
            organic,
            yes,
        } => {
            let (config, api) = api_client()?;
            let guard = RepurchaseGuard::new(api.clone(), api)
                .with_threshold_days(config.guard.threshold_days)
                .with_check_timeout(Duration::from_millis(config.guard.check_timeout_ms));

            let item = CandidateItem::new(&name, &category)
                .with_quantity(quantity)
                .with_unit(&unit)
                .with_price(price)
                .organic(organic);

            match guard.request_add(item).await? {
                AddOutcome::Committed => {
                    println!("added {quantity} {unit} of {name}");
                }
                AddOutcome::Warned(warning) => {
                    if yes || prompt_confirm(&warning.message)? {
                        let committed = guard.confirm().await?;
                        println!(
                            "added {} {} of {}",
                            committed.quantity, committed.unit, committed.name
                        );
                    } else {
                        guard.cancel();
                        println!("cancelled");
                    }
                }
            }
        }
    }
    Ok(())
}
