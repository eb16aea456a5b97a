use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_iam::Client;
use tracing::{debug, info};

use crate::{config::Settings, provider::IdentityAdmin, sdk_error};

#[async_trait]
impl IdentityAdmin for Client {
  async fn create_role(&self, path: &str, name: &str, trust_policy: &str) -> Result<String> {
    let response = self
      .create_role()
      .path(path)
      .role_name(name)
      .assume_role_policy_document(trust_policy)
      .send()
      .await
      .map_err(sdk_error)?;

    let role = response.role().context("Role missing from response")?;
    Ok(role.arn().to_owned())
  }

  async fn put_role_policy(&self, role_name: &str, policy_name: &str, policy: &str) -> Result<()> {
    self
      .put_role_policy()
      .role_name(role_name)
      .policy_name(policy_name)
      .policy_document(policy)
      .send()
      .await
      .map_err(sdk_error)?;

    Ok(())
  }
}

/// Create the execution role assumable by both Lambda and Lambda@Edge and attach the
/// logging policy to it
///
/// Returns the role ARN
pub async fn create_execution_role(admin: &dyn IdentityAdmin, settings: &Settings) -> Result<String> {
  let role_arn = admin
    .create_role(&settings.role_path, &settings.role_name, &settings.trust_policy)
    .await
    .context("Could not create IAM role")?;
  info!("Created IAM role {role_arn}");

  admin
    .put_role_policy(&settings.role_name, &settings.role_policy_name, &settings.execution_policy)
    .await
    .context("Could not put role policy")?;
  debug!("Attached inline policy {} to {}", settings.role_policy_name, settings.role_name);

  Ok(role_arn)
}
