use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_lambda::{
  operation::create_function::CreateFunctionError,
  types::{FunctionCode, Runtime},
  Client,
};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
  config::Settings,
  provider::{FunctionAdmin, FunctionSpec, RoleNotAssumable},
  sdk_error,
};

/// Lambda reports a role that IAM has not finished propagating as an invalid parameter
/// whose message says the role "cannot be assumed"
fn is_role_not_assumable(message: &str) -> bool {
  message.contains("cannot be assumed")
}

#[async_trait]
impl FunctionAdmin for Client {
  async fn create_function(&self, function: &FunctionSpec) -> Result<String> {
    let code = FunctionCode::builder()
      .s3_bucket(&function.code_bucket)
      .s3_key(&function.code_key)
      .build();

    let result = self
      .create_function()
      .function_name(&function.name)
      .handler(&function.handler)
      .runtime(Runtime::from(function.runtime.as_str()))
      .role(&function.role_arn)
      .code(code)
      .send()
      .await;

    match result {
      Ok(response) => response
        .function_arn()
        .map(str::to_owned)
        .context("Function ARN missing from response"),
      Err(err) => {
        if let Some(CreateFunctionError::InvalidParameterValueException(invalid)) = err.as_service_error() {
          let message = invalid.message().unwrap_or_default();
          if is_role_not_assumable(message) {
            return Err(
              RoleNotAssumable {
                role_arn: function.role_arn.to_owned(),
                message: message.to_owned(),
              }
              .into(),
            );
          }
        }
        Err(sdk_error(err))
      }
    }
  }

  async fn publish_version(&self, function_arn: &str, description: &str) -> Result<String> {
    let response = self
      .publish_version()
      .function_name(function_arn)
      .description(description)
      .send()
      .await
      .map_err(sdk_error)?;

    response
      .version()
      .map(str::to_owned)
      .context("Version missing from publish response")
  }
}

/// Qualified ARN of a published function version
pub fn version_arn(function_arn: &str, version: &str) -> String {
  format!("{function_arn}:{version}")
}

/// Create the function from the uploaded archive and return its ARN
///
/// A freshly created role may not be visible to Lambda yet even after the propagation delay,
/// so role validation failures are retried with exponential backoff. Any other error, or
/// running out of attempts, is fatal.
pub async fn create_function(
  admin: &dyn FunctionAdmin,
  settings: &Settings,
  role_arn: &str,
  code_key: &str,
) -> Result<String> {
  let function = FunctionSpec {
    name: settings.function_name.to_owned(),
    handler: settings.function_handler.to_owned(),
    runtime: settings.function_runtime.to_owned(),
    role_arn: role_arn.to_owned(),
    code_bucket: settings.source_bucket.to_owned(),
    code_key: code_key.to_owned(),
  };
  debug!("Function: {function:#?}");

  let retry = settings.function_retry;
  let mut attempt = 1;

  let function_arn = loop {
    match admin.create_function(&function).await {
      Ok(arn) => break arn,
      Err(err) if attempt < retry.max_attempts && err.downcast_ref::<RoleNotAssumable>().is_some() => {
        let backoff = retry.backoff(attempt);
        warn!(
          "Role not assumable yet (attempt {attempt}/{}), retrying in {}s",
          retry.max_attempts,
          backoff.as_secs_f32()
        );
        sleep(backoff).await;
        attempt += 1;
      }
      Err(err) => return Err(err.context("Could not create lambda function")),
    }
  };
  info!("Created function {function_arn}");

  Ok(function_arn)
}

/// Publish a version of the function and return the qualified version ARN
///
/// The version number is taken from the publish response; for a newly created function
/// that is `1`.
pub async fn publish_version(admin: &dyn FunctionAdmin, settings: &Settings, function_arn: &str) -> Result<String> {
  let version = admin
    .publish_version(function_arn, &settings.version_description)
    .await
    .context("Could not publish function version")?;

  let arn = version_arn(function_arn, &version);
  info!("Published function version {arn}");

  Ok(arn)
}
