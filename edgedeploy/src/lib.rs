pub mod cli;
pub mod cloudfront;
pub mod config;
pub mod deploy;
pub mod iam;
pub mod lambda;
pub mod provider;
pub mod s3;
pub mod session;

use anyhow::anyhow;
use aws_smithy_types::error::display::DisplayErrorContext;
pub use cli::Cli;
pub use config::Settings;
pub use deploy::{deploy, run, Deployment, Providers};

/// Convert an SDK error into an `anyhow::Error` carrying the full service error message
///
/// The `Display` of an `SdkError` alone is only "service error"
pub(crate) fn sdk_error<E: std::error::Error>(err: E) -> anyhow::Error {
  anyhow!("{}", DisplayErrorContext(err))
}
