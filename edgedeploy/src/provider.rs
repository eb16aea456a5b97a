//! Capabilities the deployment needs from the cloud provider
//!
//! Each stage of the deployment talks to exactly one service; the traits below are the
//! narrowest surface of that service the pipeline uses. The AWS SDK clients implement them
//! in their respective modules and the integration tests implement them with an in-memory fake.
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Object storage buckets
#[async_trait]
pub trait BucketStore: Send + Sync {
  /// Create a bucket with the given canned ACL
  async fn create_bucket(&self, name: &str, acl: &str) -> Result<()>;
}

/// Streams a local artifact into object storage
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
  async fn upload(&self, bucket: &str, key: &str, body: &mut (dyn AsyncRead + Send + Unpin)) -> Result<()>;
}

/// Identity and access management
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
  /// Create a role and return its ARN
  async fn create_role(&self, path: &str, name: &str, trust_policy: &str) -> Result<String>;

  /// Embed an inline policy in an existing role
  async fn put_role_policy(&self, role_name: &str, policy_name: &str, policy: &str) -> Result<()>;
}

/// Function service
#[async_trait]
pub trait FunctionAdmin: Send + Sync {
  /// Create the function and return its (unqualified) ARN
  ///
  /// Implementations report a role that the function service cannot assume yet as
  /// [`RoleNotAssumable`] so that the caller can retry.
  async fn create_function(&self, function: &FunctionSpec) -> Result<String>;

  /// Publish an immutable version of the function and return the version number
  async fn publish_version(&self, function_arn: &str, description: &str) -> Result<String>;
}

/// Content delivery network
#[async_trait]
pub trait CdnAdmin: Send + Sync {
  async fn create_distribution(&self, distribution: &DistributionSpec) -> Result<Distribution>;
}

/// The function service rejected the execution role because it has not propagated yet
#[derive(Debug, Error)]
#[error("role {role_arn} cannot be assumed by the function service yet: {message}")]
pub struct RoleNotAssumable {
  pub role_arn: String,
  pub message: String,
}

/// Function to create from an archive already stored in a bucket
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FunctionSpec {
  pub name: String,
  pub handler: String,
  pub runtime: String,
  pub role_arn: String,
  pub code_bucket: String,
  pub code_key: String,
}

/// Distribution with a single origin and a default cache behavior
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DistributionSpec {
  /// Idempotency token the CDN uses to dedupe creation retries
  pub caller_reference: String,
  pub comment: String,
  pub enabled: bool,
  pub origin: OriginSpec,
  pub default_cache_behavior: CacheBehaviorSpec,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OriginSpec {
  pub id: String,
  pub domain_name: String,
  /// Empty for a public origin
  pub origin_access_identity: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CacheBehaviorSpec {
  pub target_origin_id: String,
  pub min_ttl: i64,
  pub compress: bool,
  pub viewer_protocol_policy: String,
  pub function_associations: Vec<FunctionAssociation>,
  pub forward_query_string: bool,
  pub forward_cookies: String,
  pub trusted_signers_enabled: bool,
}

/// Edge function invoked at a CDN lifecycle event
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FunctionAssociation {
  /// Published version ARN; unqualified ARNs and aliases are rejected by the CDN
  pub function_arn: String,
  pub event_type: String,
  pub include_body: bool,
}

/// Distribution as created by the CDN
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Distribution {
  pub id: String,
  pub domain_name: String,
}
