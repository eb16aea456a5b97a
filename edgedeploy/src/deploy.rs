use anyhow::Result;
use serde::Serialize;
use tokio::time::sleep;
use tracing::info;

use crate::{
  cloudfront,
  config::Settings,
  iam, lambda,
  provider::{ArtifactUploader, BucketStore, CdnAdmin, FunctionAdmin, IdentityAdmin},
  s3,
  session::Session,
};

/// The services each stage of the deployment talks to
#[derive(Clone, Copy)]
pub struct Providers<'a> {
  pub buckets: &'a dyn BucketStore,
  pub uploader: &'a dyn ArtifactUploader,
  pub identity: &'a dyn IdentityAdmin,
  pub functions: &'a dyn FunctionAdmin,
  pub cdn: &'a dyn CdnAdmin,
}

impl<'a> From<&'a Session> for Providers<'a> {
  fn from(session: &'a Session) -> Self {
    Self {
      buckets: &session.s3,
      uploader: &session.s3,
      identity: &session.iam,
      functions: &session.lambda,
      cdn: &session.cloudfront,
    }
  }
}

/// Resources created by a successful deployment
#[derive(Clone, Debug, Serialize)]
pub struct Deployment {
  pub origin_bucket: String,
  pub source_bucket: String,
  pub archive_key: String,
  pub role_arn: String,
  pub function_arn: String,
  pub version_arn: String,
  pub distribution_id: String,
  pub distribution_domain_name: String,
}

/// Create every resource, in order, stopping at the first failure
///
/// Nothing created before a failure is cleaned up.
pub async fn deploy(settings: &Settings, providers: Providers<'_>) -> Result<Deployment> {
  s3::create_buckets(providers.buckets, settings).await?;
  let archive_key = s3::upload_archive(providers.uploader, settings).await?;

  let role_arn = iam::create_execution_role(providers.identity, settings).await?;

  // IAM is eventually consistent with Lambda; a role used too early fails validation
  info!(
    "Waiting {}s for role {} to propagate",
    settings.propagation_delay.as_secs(),
    settings.role_name
  );
  sleep(settings.propagation_delay).await;

  let function_arn = lambda::create_function(providers.functions, settings, &role_arn, &archive_key).await?;
  let version_arn = lambda::publish_version(providers.functions, settings, &function_arn).await?;

  let distribution = cloudfront::create_distribution(providers.cdn, settings, &version_arn).await?;

  Ok(Deployment {
    origin_bucket: settings.origin_bucket.to_owned(),
    source_bucket: settings.source_bucket.to_owned(),
    archive_key,
    role_arn,
    function_arn,
    version_arn,
    distribution_id: distribution.id,
    distribution_domain_name: distribution.domain_name,
  })
}

/// Establish a session in the configured region and deploy against AWS
pub async fn run(settings: &Settings) -> Result<Deployment> {
  let session = Session::new(&settings.region).await?;
  deploy(settings, Providers::from(&session)).await
}
