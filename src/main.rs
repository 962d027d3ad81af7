mod aggregation;
mod cli;
mod display;
mod output;
mod types;

use aggregation::Aggregator;
use anyhow::Result;
use clap::Parser;
use cli::Args;
use display::display_totals_table;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use types::Value;

const CURRENCIES: [&str; 4] = ["EUR", "GBP", "PLN", "USD"];
const COUNTRIES: [&str; 6] = ["de", "es", "fr", "it", "nl", "pt"];
const METHODS: [&str; 2] = ["pos", "atm"];

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.into_config()?;

    info!("Generating {} synthetic transactions", config.records);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut totals = Aggregator::new(["ccy", "land", "method"])?;
    for _ in 0..config.records {
        let key = vec![
            Value::from(CURRENCIES[rng.gen_range(0..CURRENCIES.len())]),
            Value::from(COUNTRIES[rng.gen_range(0..COUNTRIES.len())]),
            Value::from(METHODS[rng.gen_range(0..METHODS.len())]),
        ];
        let amount: f64 = rng.gen_range(0.01..500.0);
        totals.update_one(key, amount)?;
    }

    info!("Accumulated {} distinct keys", totals.len());
    display_totals_table("ALL TRANSACTIONS", &totals);

    let mut view = totals.clone();

    if !config.filter.is_empty() {
        let values: Vec<Value> = config.filter.iter().map(|v| Value::from(v.clone())).collect();
        view = view.filter(&values);
        info!("Filter {:?} kept {} keys", config.filter, view.len());
        display_totals_table("FILTERED", &view);
    }

    if let Some(field) = &config.collapse {
        view = view.collapse(field)?;
        info!("Collapsed {:?} down to {} keys", field, view.len());
        display_totals_table("COLLAPSED", &view);
    }

    // Reconcile two differently-shaped summaries of the same data
    let by_country = totals.collapse("method")?;
    let by_method = totals.collapse("land")?;
    let reconciled = by_country.merge(&by_method);
    display_totals_table("MERGED VIEWS", &reconciled);

    // Doubling via same-schema addition
    let doubled = view.add(&view)?;
    info!(
        "Doubled view holds {} keys over schema {:?}",
        doubled.len(),
        doubled.fields()
    );

    let sort: Vec<&str> = config
        .sort
        .iter()
        .filter(|&f| view.fields().contains(f))
        .map(String::as_str)
        .collect();
    let csv_text = view.to_csv(&sort, config.reverse, &config.dialect)?;

    match &config.output {
        Some(path) => {
            std::fs::write(path, &csv_text)?;
            info!("Wrote CSV export to {}", path.display());
        }
        None => print!("{}", csv_text),
    }

    Ok(())
}
