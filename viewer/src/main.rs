use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viewer::ViewerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "viewer=info,sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ViewerConfig::from_env()?;

    tracing::info!("Starting hexlife viewer");
    tracing::info!(
        "Frame period: {:?}, seed: {:?}",
        config.frame_period,
        config.sim.rng_seed
    );

    viewer::run(config).await
}
