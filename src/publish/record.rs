//! # Outbound records.
//!
//! [`Outbound`] turns an accepted [`Post`] into a [`PublishRecord`]:
//! topic from configuration, key from the [`PartitionKey`] policy and payload
//! in the configured [`PayloadFormat`].
//!
//! Envelope payload:
//! ```json
//! {"id": "1234", "region": "nyc", "regionData": { ...region record... }, "post": { ...item... }}
//! ```
//! `post` and `regionData` are embedded verbatim.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::value::RawValue;

use crate::error::PublishError;
use crate::regions::Region;
use crate::upstream::Post;

/// One message for the bus. Not retained after handoff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishRecord {
    /// Destination topic.
    pub topic: Arc<str>,
    /// Partition key.
    pub key: String,
    /// Serialized payload.
    pub payload: Vec<u8>,
}

/// How records are keyed on the bus.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PartitionKey {
    /// Region id: one region's records stay in order on one partition.
    #[default]
    Region,
    /// The same key for every record.
    Fixed(String),
}

impl PartitionKey {
    /// Key for a record originating in `region`.
    pub fn key_for(&self, region: &Region) -> String {
        match self {
            PartitionKey::Region => region.id.to_string(),
            PartitionKey::Fixed(k) => k.clone(),
        }
    }
}

impl FromStr for PartitionKey {
    type Err = String;

    /// Parses `region` or `fixed:<key>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "region" => Ok(PartitionKey::Region),
            other => match other.strip_prefix("fixed:") {
                Some(k) if !k.is_empty() => Ok(PartitionKey::Fixed(k.to_string())),
                Some(_) => Err("fixed partition key must not be empty".into()),
                None => Err(format!("unknown partition key policy `{other}`")),
            },
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionKey::Region => f.write_str("region"),
            PartitionKey::Fixed(k) => write!(f, "fixed:{k}"),
        }
    }
}

/// Payload encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadFormat {
    /// The item exactly as received.
    Raw,
    /// The item wrapped with its region id and region metadata.
    #[default]
    Envelope,
}

impl FromStr for PayloadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "raw" => Ok(PayloadFormat::Raw),
            "envelope" => Ok(PayloadFormat::Envelope),
            other => Err(format!("unknown payload format `{other}`")),
        }
    }
}

#[derive(Serialize)]
struct OutboundPost<'a> {
    id: Option<&'a str>,
    region: &'a str,
    #[serde(rename = "regionData")]
    region_data: &'a RawValue,
    post: &'a RawValue,
}

/// Record builder shared by every worker.
#[derive(Clone, Debug)]
pub struct Outbound {
    /// Destination topic.
    pub topic: Arc<str>,
    /// Partition key policy.
    pub key: PartitionKey,
    /// Payload encoding.
    pub format: PayloadFormat,
}

impl Default for Outbound {
    fn default() -> Self {
        Self {
            topic: Arc::from("raw-tweets"),
            key: PartitionKey::default(),
            format: PayloadFormat::default(),
        }
    }
}

impl Outbound {
    /// Builds the record for `post` accepted in `region`.
    pub fn record(&self, region: &Region, post: &Post) -> Result<PublishRecord, PublishError> {
        let payload = match self.format {
            PayloadFormat::Raw => post.raw().as_bytes().to_vec(),
            PayloadFormat::Envelope => {
                let region_data: &RawValue = serde_json::from_slice(&region.raw_metadata)
                    .map_err(|e| PublishError::Serialize(format!("region metadata: {e}")))?;
                let item: &RawValue = serde_json::from_str(post.raw())
                    .map_err(|e| PublishError::Serialize(format!("post: {e}")))?;
                serde_json::to_vec(&OutboundPost {
                    id: post.id(),
                    region: &region.id,
                    region_data,
                    post: item,
                })
                .map_err(|e| PublishError::Serialize(e.to_string()))?
            }
        };

        Ok(PublishRecord {
            topic: Arc::clone(&self.topic),
            key: self.key.key_for(region),
            payload,
        })
    }
}
