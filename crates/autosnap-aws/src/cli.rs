//! `CloudProvider` backed by the AWS CLI.
//!
//! Each trait call maps to exactly one `aws ec2 <subcommand>` process. The
//! CLI owns credentials, request signing and pagination; this module only
//! builds arguments, runs the process and decodes what comes back.

use std::process::Stdio;

use async_trait::async_trait;
use autosnap_provider::{
    CloudProvider, Instance, ProviderError, ProviderResult, Snapshot, SnapshotId, TagFilter,
    TagMatch, Tags, Volume, VolumeId,
};
use serde_json::json;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::config::AwsCliConfig;
use crate::response::{self, CliApiError};

/// API error code returned when a dry-run request would have succeeded.
const DRY_RUN_OPERATION: &str = "DryRunOperation";

/// Outcome of a single CLI invocation.
#[derive(Debug)]
enum CliOutput {
    Stdout(Vec<u8>),
    DryRun,
}

/// Render a tag filter as the CLI's JSON `--filters` value.
pub fn filter_json(filter: &TagFilter) -> String {
    let value = match &filter.mode {
        TagMatch::KeyPresent => json!([{ "Name": "tag-key", "Values": [filter.key] }]),
        TagMatch::Equals(expected) => {
            json!([{ "Name": format!("tag:{}", filter.key), "Values": [expected] }])
        }
    };
    value.to_string()
}

/// Render tags as the CLI's JSON `--tags` value.
pub fn tags_json(tags: &Tags) -> String {
    let list: Vec<_> = tags
        .iter()
        .map(|(k, v)| json!({ "Key": k, "Value": v }))
        .collect();
    serde_json::Value::Array(list).to_string()
}

/// AWS EC2 provider driven through the `aws` command-line client.
#[derive(Debug, Clone)]
pub struct AwsCliProvider {
    config: AwsCliConfig,
}

impl AwsCliProvider {
    pub fn new(config: AwsCliConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AwsCliConfig {
        &self.config
    }

    pub(crate) fn describe_instances_args(&self, filter: &TagFilter) -> Vec<String> {
        let mut args = self.config.base_args("describe-instances");
        args.extend(["--filters".to_string(), filter_json(filter)]);
        args
    }

    pub(crate) fn describe_volumes_args(&self) -> Vec<String> {
        self.config.base_args("describe-volumes")
    }

    pub(crate) fn create_snapshot_args(
        &self,
        volume_id: &VolumeId,
        description: &str,
        dry_run: bool,
    ) -> Vec<String> {
        let mut args = self.config.base_args("create-snapshot");
        args.extend([
            "--volume-id".to_string(),
            volume_id.to_string(),
            "--description".to_string(),
            description.to_string(),
        ]);
        if dry_run {
            args.push("--dry-run".to_string());
        }
        args
    }

    pub(crate) fn create_tags_args(&self, resource_id: &str, tags: &Tags) -> Vec<String> {
        let mut args = self.config.base_args("create-tags");
        args.extend([
            "--resources".to_string(),
            resource_id.to_string(),
            "--tags".to_string(),
            tags_json(tags),
        ]);
        args
    }

    pub(crate) fn describe_snapshots_args(&self, filter: &TagFilter) -> Vec<String> {
        let mut args = self.config.base_args("describe-snapshots");
        args.extend([
            "--owner-ids".to_string(),
            "self".to_string(),
            "--filters".to_string(),
            filter_json(filter),
        ]);
        args
    }

    pub(crate) fn delete_snapshot_args(
        &self,
        snapshot_id: &SnapshotId,
        dry_run: bool,
    ) -> Vec<String> {
        let mut args = self.config.base_args("delete-snapshot");
        args.extend(["--snapshot-id".to_string(), snapshot_id.to_string()]);
        if dry_run {
            args.push("--dry-run".to_string());
        }
        args
    }

    /// Run the CLI once and classify the result.
    async fn run(&self, operation: &str, args: Vec<String>) -> ProviderResult<CliOutput> {
        debug!(operation, binary = %self.config.binary, ?args, "invoking aws cli");

        let output = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ProviderError::CliNotFound {
                    binary: self.config.binary.clone(),
                },
                _ => ProviderError::Io(e),
            })?;

        if output.status.success() {
            return Ok(CliOutput::Stdout(output.stdout));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        match response::parse_api_error(&stderr) {
            Some(CliApiError { code, .. }) if code == DRY_RUN_OPERATION => Ok(CliOutput::DryRun),
            Some(CliApiError { code, message }) => Err(ProviderError::Api {
                operation: operation.to_string(),
                code,
                message,
            }),
            None => Err(ProviderError::CommandFailed {
                operation: operation.to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            }),
        }
    }

    /// Run a call that never carries `--dry-run`.
    async fn run_for_stdout(
        &self,
        operation: &str,
        args: Vec<String>,
    ) -> ProviderResult<Vec<u8>> {
        match self.run(operation, args).await? {
            CliOutput::Stdout(stdout) => Ok(stdout),
            CliOutput::DryRun => Err(ProviderError::InvalidResponse {
                operation: operation.to_string(),
                reason: "unexpected dry-run reply".to_string(),
            }),
        }
    }
}

#[async_trait]
impl CloudProvider for AwsCliProvider {
    #[instrument(skip(self, filter), fields(filter = %filter))]
    async fn list_instances(&self, filter: &TagFilter) -> ProviderResult<Vec<Instance>> {
        let stdout = self
            .run_for_stdout("DescribeInstances", self.describe_instances_args(filter))
            .await?;
        response::parse_instances(&stdout)
    }

    #[instrument(skip(self))]
    async fn list_volumes(&self) -> ProviderResult<Vec<Volume>> {
        let stdout = self
            .run_for_stdout("DescribeVolumes", self.describe_volumes_args())
            .await?;
        response::parse_volumes(&stdout)
    }

    #[instrument(skip(self, volume_id, description), fields(volume_id = %volume_id))]
    async fn create_snapshot(
        &self,
        volume_id: &VolumeId,
        description: &str,
        dry_run: bool,
    ) -> ProviderResult<Option<Snapshot>> {
        let args = self.create_snapshot_args(volume_id, description, dry_run);
        match self.run("CreateSnapshot", args).await? {
            CliOutput::Stdout(stdout) => response::parse_created_snapshot(&stdout).map(Some),
            CliOutput::DryRun => Ok(None),
        }
    }

    #[instrument(skip(self, tags))]
    async fn set_tags(&self, resource_id: &str, tags: &Tags) -> ProviderResult<()> {
        self.run_for_stdout("CreateTags", self.create_tags_args(resource_id, tags))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, filter), fields(filter = %filter))]
    async fn list_snapshots(&self, filter: &TagFilter) -> ProviderResult<Vec<Snapshot>> {
        let stdout = self
            .run_for_stdout("DescribeSnapshots", self.describe_snapshots_args(filter))
            .await?;
        response::parse_snapshots(&stdout)
    }

    #[instrument(skip(self, snapshot_id), fields(snapshot_id = %snapshot_id))]
    async fn delete_snapshot(
        &self,
        snapshot_id: &SnapshotId,
        dry_run: bool,
    ) -> ProviderResult<()> {
        self.run("DeleteSnapshot", self.delete_snapshot_args(snapshot_id, dry_run))
            .await?;
        Ok(())
    }
}
