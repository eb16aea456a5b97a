use anyhow::{Context, Result};
use aws_config::{meta::region::RegionProviderChain, retry::RetryConfig, BehaviorVersion, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_types::region::Region;
use tracing::{debug, info};

/// Attempts made by each service client before giving up on a request
const MAX_ATTEMPTS: u32 = 3;

/// Get the configuration to authn/authz with AWS that will be used across AWS clients
pub async fn get_sdk_config(region: &str) -> Result<SdkConfig> {
  let region_provider = RegionProviderChain::first_try(Some(Region::new(region.to_owned())));

  Ok(
    aws_config::defaults(BehaviorVersion::latest())
      .region(region_provider)
      .load()
      .await,
  )
}

/// Resolve credentials through the default chain up front
///
/// The SDK resolves credentials lazily on the first request; doing it here makes a missing
/// credential chain fail before any resource is created.
pub async fn verify_credentials(config: &SdkConfig) -> Result<()> {
  let provider = config
    .credentials_provider()
    .context("No credentials provider configured")?;

  provider
    .provide_credentials()
    .await
    .context("Did you pass the credentials?")?;

  Ok(())
}

/// Service clients used by the deployment, all sharing one region and credential chain
#[derive(Clone, Debug)]
pub struct Session {
  pub s3: aws_sdk_s3::Client,
  pub iam: aws_sdk_iam::Client,
  pub lambda: aws_sdk_lambda::Client,
  pub cloudfront: aws_sdk_cloudfront::Client,
}

impl Session {
  /// Load shared configuration for `region`, check credentials, and build the clients
  pub async fn new(region: &str) -> Result<Self> {
    let config = get_sdk_config(region).await?;
    verify_credentials(&config).await?;
    info!("Session established in {region}");

    Ok(Self::from_config(&config))
  }

  pub fn from_config(config: &SdkConfig) -> Self {
    debug!("Building clients for region {:?}", config.region());

    Self {
      s3: aws_sdk_s3::Client::from_conf(
        aws_sdk_s3::config::Builder::from(config)
          .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
          .build(),
      ),
      iam: aws_sdk_iam::Client::from_conf(
        aws_sdk_iam::config::Builder::from(config)
          .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
          .build(),
      ),
      lambda: aws_sdk_lambda::Client::from_conf(
        aws_sdk_lambda::config::Builder::from(config)
          .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
          .build(),
      ),
      cloudfront: aws_sdk_cloudfront::Client::from_conf(
        aws_sdk_cloudfront::config::Builder::from(config)
          .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
          .build(),
      ),
    }
  }
}
