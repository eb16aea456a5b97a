use std::process;

use anyhow::Result;
use clap::Parser;
use edgedeploy::{Cli, Settings};
use tracing::{debug, error, info};
use tracing_log::AsTrace;
use tracing_subscriber::FmtSubscriber;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let subscriber = FmtSubscriber::builder()
    .with_max_level(cli.verbose.log_level_filter().as_trace())
    .without_time()
    .with_ansi(!cli.no_color)
    .finish();
  tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

  let settings = Settings::default();
  debug!("Settings: {settings:#?}");

  match edgedeploy::run(&settings).await {
    Ok(deployment) => {
      info!("Deployment complete: {}", serde_json::to_string(&deployment)?);
      Ok(())
    }
    Err(err) => {
      error!("Deployment failed");
      eprintln!("{err:#}");
      process::exit(2);
    }
  }
}
