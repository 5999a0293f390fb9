use anyhow::Context;
use tracing::{error, info};

use publisher_locator::{config::Config, observability, pipeline};

fn main() -> anyhow::Result<()> {
    observability::tracing::init("merge")?;

    if let Err(err) = run() {
        error!(error = ?err, "publisher location merge failed");
        return Err(err);
    }
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    let report = pipeline::run_merge(
        config.dataset_path(),
        config.locations_path(),
        config.enriched_path(),
    )?;

    info!(
        written_rows = report.written_rows,
        output = %config.enriched_path().display(),
        "done"
    );
    Ok(())
}
