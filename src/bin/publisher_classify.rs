use anyhow::Context;
use tracing::{error, info};

use publisher_locator::{
    classifier::PublisherClassifier,
    clients::{AnthropicClient, AnthropicConfig},
    config::Config,
    observability, pipeline,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    observability::tracing::init("classify")?;

    if let Err(err) = run().await {
        error!(error = ?err, "publisher classification failed");
        return Err(err);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    let api_key = config.require_api_key()?.to_string();

    let client = AnthropicClient::new(AnthropicConfig {
        base_url: config.anthropic_base_url().to_string(),
        api_key,
        model: config.anthropic_model().to_string(),
        max_tokens: config.anthropic_max_tokens(),
        timeout: config.anthropic_timeout(),
    })
    .context("failed to build anthropic client")?;
    let classifier = PublisherClassifier::new(client, config.retry_policy());

    let report = pipeline::run_classification(
        config.dataset_path(),
        config.locations_path(),
        &classifier,
    )
    .await?;

    info!(
        rows = report.rows,
        unique_publishers = report.unique_publishers,
        output = %config.locations_path().display(),
        "done"
    );
    Ok(())
}
