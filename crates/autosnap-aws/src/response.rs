//! Decoding of `aws ec2 ... --output json` responses into the provider model.

use autosnap_provider::{
    Instance, InstanceId, ProviderError, ProviderResult, Snapshot, SnapshotId, Tags, Volume,
    VolumeId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawTag {
    key: String,
    #[serde(default)]
    value: String,
}

fn into_tags(raw: Vec<RawTag>) -> Tags {
    raw.into_iter().map(|t| (t.key, t.value)).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesOutput {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<RawInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawInstance {
    instance_id: String,
    #[serde(default)]
    tags: Vec<RawTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVolumesOutput {
    #[serde(default)]
    volumes: Vec<RawVolume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawVolume {
    volume_id: String,
    #[serde(default)]
    attachments: Vec<RawAttachment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawAttachment {
    instance_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSnapshotsOutput {
    #[serde(default)]
    snapshots: Vec<RawSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSnapshot {
    snapshot_id: String,
    #[serde(default)]
    volume_id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<RawTag>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    start_time: Option<DateTime<Utc>>,
}

/// `StartTime` is informational; an unreadable value decodes as `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc)))
}

impl From<RawSnapshot> for Snapshot {
    fn from(raw: RawSnapshot) -> Self {
        Snapshot {
            id: SnapshotId(raw.snapshot_id),
            volume_id: VolumeId(raw.volume_id),
            description: raw.description,
            tags: into_tags(raw.tags),
            started_at: raw.start_time,
        }
    }
}

pub(crate) fn parse_instances(stdout: &[u8]) -> ProviderResult<Vec<Instance>> {
    let out: DescribeInstancesOutput = serde_json::from_slice(stdout)?;
    Ok(out
        .reservations
        .into_iter()
        .flat_map(|r| r.instances)
        .map(|i| Instance {
            id: InstanceId(i.instance_id),
            tags: into_tags(i.tags),
        })
        .collect())
}

/// Volumes report their first attachment only; multi-attach volumes are
/// treated as belonging to the first instance listed.
pub(crate) fn parse_volumes(stdout: &[u8]) -> ProviderResult<Vec<Volume>> {
    let out: DescribeVolumesOutput = serde_json::from_slice(stdout)?;
    Ok(out
        .volumes
        .into_iter()
        .map(|v| Volume {
            id: VolumeId(v.volume_id),
            attached_to: v
                .attachments
                .into_iter()
                .find_map(|a| a.instance_id)
                .map(InstanceId),
        })
        .collect())
}

pub(crate) fn parse_snapshots(stdout: &[u8]) -> ProviderResult<Vec<Snapshot>> {
    let out: DescribeSnapshotsOutput = serde_json::from_slice(stdout)?;
    Ok(out.snapshots.into_iter().map(Snapshot::from).collect())
}

pub(crate) fn parse_created_snapshot(stdout: &[u8]) -> ProviderResult<Snapshot> {
    let raw: RawSnapshot = serde_json::from_slice(stdout)?;
    if raw.snapshot_id.is_empty() {
        return Err(ProviderError::InvalidResponse {
            operation: "CreateSnapshot".to_string(),
            reason: "empty SnapshotId".to_string(),
        });
    }
    Ok(raw.into())
}

/// API error reported on stderr by the AWS CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliApiError {
    pub code: String,
    pub message: String,
}

/// Extract the error code and message from AWS CLI stderr, e.g.
/// `An error occurred (RequestLimitExceeded) when calling the CreateSnapshot
/// operation: Request limit exceeded.`
pub(crate) fn parse_api_error(stderr: &str) -> Option<CliApiError> {
    let start = stderr.find("An error occurred (")? + "An error occurred (".len();
    let rest = &stderr[start..];
    let end = rest.find(')')?;
    let code = rest[..end].trim().to_string();
    if code.is_empty() {
        return None;
    }
    let message = rest[end..]
        .split_once(": ")
        .map(|(_, msg)| msg.trim())
        .unwrap_or_default()
        .to_string();
    Some(CliApiError { code, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_flatten_reservations() {
        let json = br#"{
            "Reservations": [
                {"Instances": [
                    {"InstanceId": "i-1", "Tags": [{"Key": "Name", "Value": "web1"}, {"Key": "ToSnap", "Value": "True"}]},
                    {"InstanceId": "i-2"}
                ]},
                {"Instances": [{"InstanceId": "i-3", "Tags": []}]}
            ]
        }"#;
        let instances = parse_instances(json).unwrap();
        assert_eq!(instances.len(), 3);
        assert_eq!(instances[0].name(), Some("web1"));
        assert_eq!(instances[0].tags.get("ToSnap"), Some("True"));
        assert!(instances[1].tags.is_empty());
        assert_eq!(instances[2].id, InstanceId::new("i-3"));
    }

    #[test]
    fn empty_describe_instances() {
        assert!(parse_instances(b"{}").unwrap().is_empty());
    }

    #[test]
    fn volumes_take_first_attachment() {
        let json = br#"{"Volumes": [
            {"VolumeId": "vol-1", "Attachments": [{"InstanceId": "i-1", "State": "attached"}]},
            {"VolumeId": "vol-2", "Attachments": []},
            {"VolumeId": "vol-3"}
        ]}"#;
        let volumes = parse_volumes(json).unwrap();
        assert_eq!(volumes[0].attached_to, Some(InstanceId::new("i-1")));
        assert_eq!(volumes[1].attached_to, None);
        assert_eq!(volumes[2].attached_to, None);
    }

    #[test]
    fn snapshots_keep_tags_and_start_time() {
        let json = br#"{"Snapshots": [{
            "SnapshotId": "snap-1",
            "VolumeId": "vol-1",
            "Description": "Auto web1 2024-06-01 Snapshot",
            "StartTime": "2024-06-01T03:00:00.000Z",
            "Tags": [{"Key": "Date", "Value": "2024-06-01"}, {"Key": "AutoSnapshot", "Value": "True"}]
        }]}"#;
        let snapshots = parse_snapshots(json).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].date_tag(), Some("2024-06-01"));
        assert!(snapshots[0].name().is_none());
        assert!(snapshots[0].started_at.is_some());
    }

    #[test]
    fn unreadable_start_time_does_not_fail_listing() {
        let json = br#"{"Snapshots": [
            {"SnapshotId": "snap-1", "StartTime": "yesterday",
             "Tags": [{"Key": "Date", "Value": "2024-06-01"}]},
            {"SnapshotId": "snap-2", "StartTime": 1717210800},
            {"SnapshotId": "snap-3", "StartTime": null},
            {"SnapshotId": "snap-4", "StartTime": "2024-06-01T03:00:00.000000+00:00"}
        ]}"#;
        let snapshots = parse_snapshots(json).unwrap();
        assert_eq!(snapshots.len(), 4);
        assert!(snapshots[0].started_at.is_none());
        assert_eq!(snapshots[0].date_tag(), Some("2024-06-01"));
        assert!(snapshots[1].started_at.is_none());
        assert!(snapshots[2].started_at.is_none());
        assert!(snapshots[3].started_at.is_some());
    }

    #[test]
    fn created_snapshot_requires_id() {
        let ok = parse_created_snapshot(
            br#"{"SnapshotId": "snap-9", "VolumeId": "vol-1", "State": "pending"}"#,
        )
        .unwrap();
        assert_eq!(ok.id, SnapshotId::new("snap-9"));

        let err = parse_created_snapshot(br#"{"SnapshotId": ""}"#).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = parse_volumes(b"not json").unwrap_err();
        assert!(matches!(err, ProviderError::Json(_)));
    }

    #[test]
    fn api_error_from_stderr() {
        let stderr = "\nAn error occurred (DryRunOperation) when calling the CreateSnapshot \
                      operation: Request would have succeeded, but DryRun flag is set.\n";
        let parsed = parse_api_error(stderr).unwrap();
        assert_eq!(parsed.code, "DryRunOperation");
        assert_eq!(
            parsed.message,
            "Request would have succeeded, but DryRun flag is set."
        );
    }

    #[test]
    fn stderr_without_api_error() {
        assert!(parse_api_error("Unable to locate credentials.").is_none());
        assert!(parse_api_error("An error occurred () when calling").is_none());
    }
}
