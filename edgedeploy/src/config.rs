use std::path::PathBuf;

use serde::Serialize;
use tokio::time::Duration;

/// Edge function associations are only accepted on distributions created from this region
pub const REGION: &str = "us-east-1";

pub const ORIGIN_BUCKET_NAME: &str = "medium-lambda-go-sdk-origin-white-1";
pub const SOURCE_BUCKET_NAME: &str = "medium-lambda-go-sdk-source-code-white-1";
pub const BUCKET_ACL: &str = "public-read";

pub const ROLE_NAME: &str = "medium-lambda-go-sdk-role-white-11";
pub const ROLE_PATH: &str = "/service-role/";
pub const ROLE_POLICY_NAME: &str = "stackers-lambda-exec-policy";

pub const FUNCTION_NAME: &str = "medium-lambda-go-sdk-function-white-11";
pub const FUNCTION_HANDLER: &str = "index.handler";
pub const FUNCTION_RUNTIME: &str = "nodejs12.x";
pub const FUNCTION_VERSION_DESCRIPTION: &str = "Example function for Medium";

pub const ORIGIN_ID: &str = "ORIGIN_ID";

/// Local deployment package, relative to the working directory
pub const ARCHIVE_PATH: &str = "source.zip";

/// Trust policy allowing both the Lambda and the Lambda@Edge service principals to assume the role
///
/// Kept byte-for-byte as deployed
pub const TRUST_POLICY: &str = "{\"Version\": \"2012-10-17\",\"Statement\": [{\"Effect\": \"Allow\",\"Principal\": {\"Service\": [\"lambda.amazonaws.com\",\"edgelambda.amazonaws.com\"]},\"Action\": \"sts:AssumeRole\"}]}";

/// Inline policy granting write access to CloudWatch logs
pub const EXECUTION_POLICY: &str = "{\"Version\": \"2012-10-17\", \"Statement\": [ { \"Effect\": \"Allow\", \"Action\": [ \"logs:CreateLogGroup\", \"logs:CreateLogStream\", \"logs:PutLogEvents\" ], \"Resource\": [ \"arn:aws:logs:*:*:*\" ] } ] }";

/// Time given to IAM to propagate a new role before Lambda validates it
pub const ROLE_PROPAGATION_DELAY: Duration = Duration::from_secs(20);

/// Bounded retry applied to `CreateFunction` while the role is not yet assumable
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RetryPolicy {
  /// Total number of attempts, including the first
  pub max_attempts: u32,
  /// Wait before the second attempt; doubled after each subsequent failure
  pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 5,
      initial_backoff: Duration::from_secs(2),
    }
  }
}

impl RetryPolicy {
  /// Backoff to wait after the given (1-based) failed attempt
  pub fn backoff(&self, attempt: u32) -> Duration {
    self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
  }
}

/// Everything the deployment needs to know about the resources it creates
///
/// `Settings::default()` carries the names of the deployed system; tests swap
/// individual fields with struct update syntax.
#[derive(Clone, Debug, Serialize)]
pub struct Settings {
  pub region: String,

  pub origin_bucket: String,
  pub source_bucket: String,
  pub bucket_acl: String,

  pub role_name: String,
  pub role_path: String,
  pub role_policy_name: String,
  pub trust_policy: String,
  pub execution_policy: String,

  pub function_name: String,
  pub function_handler: String,
  pub function_runtime: String,
  pub version_description: String,

  pub origin_id: String,

  /// Path to the deployment package; its file name is used as the object key
  pub archive_path: PathBuf,

  pub propagation_delay: Duration,
  pub function_retry: RetryPolicy,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      region: REGION.to_owned(),
      origin_bucket: ORIGIN_BUCKET_NAME.to_owned(),
      source_bucket: SOURCE_BUCKET_NAME.to_owned(),
      bucket_acl: BUCKET_ACL.to_owned(),
      role_name: ROLE_NAME.to_owned(),
      role_path: ROLE_PATH.to_owned(),
      role_policy_name: ROLE_POLICY_NAME.to_owned(),
      trust_policy: TRUST_POLICY.to_owned(),
      execution_policy: EXECUTION_POLICY.to_owned(),
      function_name: FUNCTION_NAME.to_owned(),
      function_handler: FUNCTION_HANDLER.to_owned(),
      function_runtime: FUNCTION_RUNTIME.to_owned(),
      version_description: FUNCTION_VERSION_DESCRIPTION.to_owned(),
      origin_id: ORIGIN_ID.to_owned(),
      archive_path: PathBuf::from(ARCHIVE_PATH),
      propagation_delay: ROLE_PROPAGATION_DELAY,
      function_retry: RetryPolicy::default(),
    }
  }
}

impl Settings {
  /// Object key for the archive in the source bucket (basename of the archive path)
  ///
  /// `None` when the path has no file name, e.g. `..` or `/`
  pub fn archive_key(&self) -> Option<String> {
    self
      .archive_path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
  }

  /// Default S3 DNS name of the origin bucket (`<bucket>.s3.amazonaws.com`)
  pub fn origin_domain_name(&self) -> String {
    format!("{}.s3.amazonaws.com", self.origin_bucket)
  }
}
