use log::{info, warn};

use tims_insight::config::InsightConfig;
use tims_insight::server::{self, AppState};
use tims_insight::InsightBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()>
{   env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    )
    .init();

    let config = InsightConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let state = match InsightBackend::from_config(&config)
    {   Ok(backend) => AppState::new(backend)
      , Err(e) => {
          warn!("{}; /api/chat will answer with 500 until it is set", e);
          AppState::unconfigured()
        }
    };

    server::serve(&config.bind, state, async {
      let _ = tokio::signal::ctrl_c().await;
      info!("Received shutdown signal");
    })
    .await?;

    Ok(())
}
