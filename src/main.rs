//! `mask-trainer`: train one classifier, or search over trial settings.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use mask_trainer::cli::Cli;
use mask_trainer::registry::Registry;
use mask_trainer::train::{run_search, run_trial};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mask_trainer=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.trial_config().context("invalid trial configuration")?;
    let registry = Registry::with_defaults();

    if cli.search {
        let search = cli.search_config().context("invalid search configuration")?;
        let study = run_search(&config, &registry, &search).context("search failed")?;
        if let Some(best) = study.best_trial() {
            info!(trial = best.number, value = best.value, params = ?best.params, "best trial");
        }
    } else {
        let outcome = run_trial(&config, &registry).context("trial failed")?;
        info!(dir = %outcome.dir.display(), best_f1 = outcome.best_f1, "done");
    }

    Ok(())
}
