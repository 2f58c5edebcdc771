//! autosnap-aws: AWS EC2 backend for autosnap
//!
//! Implements `CloudProvider` on top of the AWS CLI, so credentials,
//! profiles, request signing and pagination are handled exactly as they are
//! for any other `aws` invocation on the host.

mod cli;
mod config;
mod response;

pub use cli::{filter_json, tags_json, AwsCliProvider};
pub use config::{AwsCliConfig, DEFAULT_REGION};

/// Check if the AWS CLI is available at `binary`
pub fn is_aws_cli_available(binary: &str) -> bool {
    std::process::Command::new(binary)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
