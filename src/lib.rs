pub mod clients;
pub mod config;
pub mod discovery;
pub mod job;
pub mod services;
pub mod tags;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A resource found through the tag listing API or an extension hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedResource {
    /// Resource ARN, unique per account and region
    pub arn: String,

    /// Namespace of the job that discovered the resource
    pub namespace: String,

    pub region: String,

    /// Tags as returned by the API; order carries no meaning
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// A single raw datapoint returned by the metric client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudwatchData {
    pub metric_name: String,
    pub namespace: String,
    pub resource_name: String,
    pub dimensions: Vec<Dimension>,
    pub statistic: String,
    pub value: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub tags: Vec<Tag>,
}

/// Runtime identity of one (job, region, role) unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    pub region: String,

    /// Account ID as resolved through the account client, never configured
    pub account_id: String,

    /// Tags stamped onto every metric of the unit
    pub custom_tags: Vec<Tag>,
}

/// Metrics produced by one unit together with the identity that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudwatchMetricResult {
    pub context: JobContext,
    pub data: Vec<CloudwatchData>,
}
