//! AWS CLI configuration

use serde::{Deserialize, Serialize};

/// Region used when neither the caller nor the environment names one.
pub const DEFAULT_REGION: &str = "us-west-2";

/// How to invoke the AWS CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsCliConfig {
    /// CLI executable (default: `aws`)
    pub binary: String,
    /// Target region, passed as `--region`
    pub region: String,
    /// Named credentials profile, passed as `--profile`
    pub profile: Option<String>,
}

impl Default for AwsCliConfig {
    fn default() -> Self {
        AwsCliConfig {
            binary: std::env::var("AUTOSNAP_AWS_CLI").unwrap_or_else(|_| "aws".to_string()),
            region: std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            profile: std::env::var("AWS_PROFILE").ok(),
        }
    }
}

impl AwsCliConfig {
    /// Create a config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create a config for a specific region using the `aws` binary on PATH
    pub fn new(region: impl Into<String>) -> Self {
        AwsCliConfig {
            binary: "aws".to_string(),
            region: region.into(),
            profile: None,
        }
    }

    /// Set the credentials profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set the CLI executable
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Arguments shared by every `aws ec2` invocation.
    pub(crate) fn base_args(&self, subcommand: &str) -> Vec<String> {
        let mut args = vec![
            "ec2".to_string(),
            subcommand.to_string(),
            "--region".to_string(),
            self.region.clone(),
            "--output".to_string(),
            "json".to_string(),
        ];
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args
    }
}
