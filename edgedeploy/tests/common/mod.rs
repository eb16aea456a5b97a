//! In-memory stand-in for the AWS services used by the deployment
#![allow(dead_code)]

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  sync::Mutex,
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use edgedeploy::{
  config::Settings,
  provider::{
    ArtifactUploader, BucketStore, CdnAdmin, Distribution, DistributionSpec, FunctionAdmin, FunctionSpec,
    IdentityAdmin, RoleNotAssumable,
  },
  Providers,
};
use tempfile::TempDir;
use tokio::{
  io::{AsyncRead, AsyncReadExt},
  time::{Duration, Instant},
};

pub const ACCOUNT_ID: &str = "123456789012";
pub const ARCHIVE_CONTENTS: &[u8] = b"PK\x03\x04 not really a zip";

/// Every request the fake received, in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
  CreateBucket(String),
  Upload { bucket: String, key: String },
  CreateRole(String),
  PutRolePolicy { role: String, policy: String },
  CreateFunction(String),
  PublishVersion(String),
  CreateDistribution(String),
}

/// Errors to inject
#[derive(Clone, Debug, Default)]
pub struct Failures {
  pub upload: bool,
  pub create_role: bool,
  pub publish_version: bool,
}

#[derive(Clone, Debug)]
pub struct Role {
  pub arn: String,
  pub path: String,
  pub trust_policy: String,
  pub inline_policies: BTreeMap<String, String>,
  pub created_at: Instant,
}

#[derive(Clone, Debug)]
pub struct Function {
  pub arn: String,
  pub spec: FunctionSpec,
  pub versions: Vec<String>,
}

#[derive(Debug, Default)]
pub struct State {
  pub calls: Vec<Call>,
  pub buckets: BTreeMap<String, String>,
  pub objects: BTreeMap<(String, String), Vec<u8>>,
  pub roles: BTreeMap<String, Role>,
  pub functions: BTreeMap<String, Function>,
  pub function_attempts: Vec<Instant>,
  pub distributions: BTreeMap<String, DistributionSpec>,
}

/// Fake provider
///
/// A role only becomes assumable by the function service `propagation` after it was created,
/// measured on the tokio clock.
#[derive(Debug)]
pub struct FakeCloud {
  pub state: Mutex<State>,
  pub failures: Failures,
  pub propagation: Duration,
}

impl FakeCloud {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(State::default()),
      failures: Failures::default(),
      propagation: Duration::from_secs(20),
    }
  }

  pub fn with_failures(failures: Failures) -> Self {
    Self {
      failures,
      ..Self::new()
    }
  }

  /// Seed a bucket that already exists in the account
  pub fn with_bucket(self, name: &str) -> Self {
    self
      .state
      .lock()
      .unwrap()
      .buckets
      .insert(name.to_owned(), "private".to_owned());
    self
  }

  pub fn providers(&self) -> Providers<'_> {
    Providers {
      buckets: self,
      uploader: self,
      identity: self,
      functions: self,
      cdn: self,
    }
  }

  pub fn calls(&self) -> Vec<Call> {
    self.state.lock().unwrap().calls.clone()
  }

  fn record(&self, call: Call) {
    self.state.lock().unwrap().calls.push(call);
  }
}

#[async_trait]
impl BucketStore for FakeCloud {
  async fn create_bucket(&self, name: &str, acl: &str) -> Result<()> {
    self.record(Call::CreateBucket(name.to_owned()));

    let mut state = self.state.lock().unwrap();
    if state.buckets.contains_key(name) {
      bail!("BucketAlreadyOwnedByYou: Your previous request to create the named bucket succeeded and you already own it.");
    }
    state.buckets.insert(name.to_owned(), acl.to_owned());

    Ok(())
  }
}

#[async_trait]
impl ArtifactUploader for FakeCloud {
  async fn upload(&self, bucket: &str, key: &str, body: &mut (dyn AsyncRead + Send + Unpin)) -> Result<()> {
    self.record(Call::Upload {
      bucket: bucket.to_owned(),
      key: key.to_owned(),
    });

    let mut contents = Vec::new();
    if self.failures.upload {
      // Fail part way through the stream
      let mut first = [0u8; 4];
      body.read_exact(&mut first).await?;
      bail!("RequestTimeout: Your socket connection to the server was not read from or written to within the timeout period.");
    }
    body.read_to_end(&mut contents).await?;

    let mut state = self.state.lock().unwrap();
    if !state.buckets.contains_key(bucket) {
      bail!("NoSuchBucket: The specified bucket does not exist");
    }
    state.objects.insert((bucket.to_owned(), key.to_owned()), contents);

    Ok(())
  }
}

#[async_trait]
impl IdentityAdmin for FakeCloud {
  async fn create_role(&self, path: &str, name: &str, trust_policy: &str) -> Result<String> {
    self.record(Call::CreateRole(name.to_owned()));

    if self.failures.create_role {
      bail!("AccessDenied: User is not authorized to perform: iam:CreateRole");
    }

    let mut state = self.state.lock().unwrap();
    if state.roles.contains_key(name) {
      bail!("EntityAlreadyExists: Role with name {name} already exists.");
    }

    let arn = format!("arn:aws:iam::{ACCOUNT_ID}:role{path}{name}");
    state.roles.insert(
      name.to_owned(),
      Role {
        arn: arn.clone(),
        path: path.to_owned(),
        trust_policy: trust_policy.to_owned(),
        inline_policies: BTreeMap::new(),
        created_at: Instant::now(),
      },
    );

    Ok(arn)
  }

  async fn put_role_policy(&self, role_name: &str, policy_name: &str, policy: &str) -> Result<()> {
    self.record(Call::PutRolePolicy {
      role: role_name.to_owned(),
      policy: policy_name.to_owned(),
    });

    let mut state = self.state.lock().unwrap();
    let role = state
      .roles
      .get_mut(role_name)
      .ok_or_else(|| anyhow!("NoSuchEntity: The role with name {role_name} cannot be found."))?;
    role.inline_policies.insert(policy_name.to_owned(), policy.to_owned());

    Ok(())
  }
}

#[async_trait]
impl FunctionAdmin for FakeCloud {
  async fn create_function(&self, function: &FunctionSpec) -> Result<String> {
    self.record(Call::CreateFunction(function.name.to_owned()));

    let mut state = self.state.lock().unwrap();
    state.function_attempts.push(Instant::now());

    let role = state
      .roles
      .values()
      .find(|role| role.arn == function.role_arn)
      .ok_or_else(|| anyhow!("InvalidParameterValueException: role {} not found", function.role_arn))?;
    if role.created_at.elapsed() < self.propagation {
      return Err(
        RoleNotAssumable {
          role_arn: function.role_arn.to_owned(),
          message: "The role defined for the function cannot be assumed by Lambda.".to_owned(),
        }
        .into(),
      );
    }

    if !state
      .objects
      .contains_key(&(function.code_bucket.to_owned(), function.code_key.to_owned()))
    {
      bail!("InvalidParameterValueException: Error occurred while GetObject. S3 Error Code: NoSuchKey");
    }

    let arn = format!("arn:aws:lambda:us-east-1:{ACCOUNT_ID}:function:{}", function.name);
    if state.functions.contains_key(&arn) {
      bail!("ResourceConflictException: Function already exist: {}", function.name);
    }
    state.functions.insert(
      arn.clone(),
      Function {
        arn: arn.clone(),
        spec: function.clone(),
        versions: Vec::new(),
      },
    );

    Ok(arn)
  }

  async fn publish_version(&self, function_arn: &str, _description: &str) -> Result<String> {
    self.record(Call::PublishVersion(function_arn.to_owned()));

    if self.failures.publish_version {
      bail!("ServiceException: The AWS Lambda service encountered an internal error.");
    }

    let mut state = self.state.lock().unwrap();
    let function = state
      .functions
      .get_mut(function_arn)
      .ok_or_else(|| anyhow!("ResourceNotFoundException: Function not found: {function_arn}"))?;
    let version = (function.versions.len() + 1).to_string();
    function.versions.push(version.clone());

    Ok(version)
  }
}

#[async_trait]
impl CdnAdmin for FakeCloud {
  async fn create_distribution(&self, distribution: &DistributionSpec) -> Result<Distribution> {
    self.record(Call::CreateDistribution(distribution.caller_reference.to_owned()));

    let mut state = self.state.lock().unwrap();
    if state
      .distributions
      .values()
      .any(|existing| existing.caller_reference == distribution.caller_reference)
    {
      bail!("DistributionAlreadyExists: The caller reference that you are using to create a distribution is associated with another distribution.");
    }

    let id = format!("E{:013}", state.distributions.len() + 1);
    state.distributions.insert(id.clone(), distribution.clone());

    Ok(Distribution {
      domain_name: format!("d{}.cloudfront.net", id.to_lowercase()),
      id,
    })
  }
}

/// Working directory holding a deployment package
pub struct Workspace {
  pub dir: TempDir,
}

impl Workspace {
  pub fn with_archive() -> Self {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("source.zip"), ARCHIVE_CONTENTS).unwrap();
    Self { dir }
  }

  pub fn empty() -> Self {
    Self {
      dir: tempfile::tempdir().unwrap(),
    }
  }

  pub fn archive_path(&self) -> PathBuf {
    self.dir.path().join("source.zip")
  }

  /// Default settings pointed at this workspace's archive
  pub fn settings(&self) -> Settings {
    Settings {
      archive_path: self.archive_path(),
      ..Settings::default()
    }
  }
}

/// Number of descriptors this process holds open on `path`
#[cfg(target_os = "linux")]
pub fn open_handles(path: &Path) -> usize {
  let target = path.canonicalize().unwrap();
  std::fs::read_dir("/proc/self/fd")
    .unwrap()
    .filter_map(|entry| entry.ok())
    .filter_map(|entry| std::fs::read_link(entry.path()).ok())
    .filter(|link| *link == target)
    .count()
}
