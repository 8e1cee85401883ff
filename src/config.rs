use std::path::Path;

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::services::SUPPORTED_SERVICES;
use crate::tags::SearchTag;
use crate::{Dimension, Tag};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("job {job} has no regions configured")]
    NoRegions { job: String },

    #[error("discovery job type {0} is not a supported service")]
    UnknownJobType(String),

    #[error("job {job} has no metrics configured")]
    NoMetrics { job: String },

    #[error("invalid search tag pattern {pattern:?} for key {key}: {source}")]
    InvalidSearchTag {
        key: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{field} must be greater than zero")]
    ZeroSetting { field: &'static str },
}

/// An assumable identity; the empty role means the ambient credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub role_arn: String,

    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub name: String,
    pub statistics: Vec<String>,

    /// Period in seconds
    #[serde(default = "default_period")]
    pub period: u64,

    /// Lookback window in seconds
    #[serde(default = "default_length")]
    pub length: u64,
}

fn default_period() -> u64 {
    300
}

fn default_length() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchTagConfig {
    pub key: String,

    /// Regular expression the tag value must match
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryJobConfig {
    #[serde(rename = "type")]
    pub job_type: String,
    pub regions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub search_tags: Vec<SearchTagConfig>,
    #[serde(default)]
    pub custom_tags: Vec<Tag>,
    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticJobConfig {
    pub name: String,
    pub namespace: String,
    pub regions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub custom_tags: Vec<Tag>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomNamespaceJobConfig {
    pub name: String,
    pub namespace: String,
    pub regions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub custom_tags: Vec<Tag>,
    #[serde(default)]
    pub dimension_name_requirements: Vec<String>,
    pub metrics: Vec<MetricConfig>,
}

/// Concurrency ceilings handed to the cloudwatch clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudwatchConcurrency {
    #[serde(default = "default_concurrency")]
    pub single_limit: usize,
    #[serde(default)]
    pub per_api_limit_enabled: bool,
    #[serde(default = "default_concurrency")]
    pub list_metrics: usize,
    #[serde(default = "default_concurrency")]
    pub get_metric_data: usize,
    #[serde(default = "default_concurrency")]
    pub get_metric_statistics: usize,
}

impl CloudwatchConcurrency {
    /// The first limit in effect that is set to zero
    fn zero_limit(&self) -> Option<&'static str> {
        let limits = if self.per_api_limit_enabled {
            vec![
                ("cloudwatch_concurrency.list_metrics", self.list_metrics),
                ("cloudwatch_concurrency.get_metric_data", self.get_metric_data),
                (
                    "cloudwatch_concurrency.get_metric_statistics",
                    self.get_metric_statistics,
                ),
            ]
        } else {
            vec![("cloudwatch_concurrency.single_limit", self.single_limit)]
        };

        limits
            .into_iter()
            .find(|(_, limit)| *limit == 0)
            .map(|(field, _)| field)
    }
}

impl Default for CloudwatchConcurrency {
    fn default() -> Self {
        Self {
            single_limit: default_concurrency(),
            per_api_limit_enabled: false,
            list_metrics: default_concurrency(),
            get_metric_data: default_concurrency(),
            get_metric_statistics: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Emit discovered resources even when no metrics came back for them
    #[serde(default)]
    pub always_return_info_metrics: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeSettings {
    #[serde(default = "default_metrics_per_query")]
    pub metrics_per_query: usize,
    #[serde(default = "default_concurrency")]
    pub tagging_api_concurrency: usize,
    #[serde(default)]
    pub cloudwatch_concurrency: CloudwatchConcurrency,
    #[serde(default)]
    pub flags: FeatureFlags,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            metrics_per_query: default_metrics_per_query(),
            tagging_api_concurrency: default_concurrency(),
            cloudwatch_concurrency: CloudwatchConcurrency::default(),
            flags: FeatureFlags::default(),
        }
    }
}

fn default_metrics_per_query() -> usize {
    500
}

fn default_concurrency() -> usize {
    5
}

/// Configuration file as written by the operator
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discovery: Vec<DiscoveryJobConfig>,

    #[serde(default, rename = "static")]
    pub static_jobs: Vec<StaticJobConfig>,

    #[serde(default)]
    pub custom_namespace: Vec<CustomNamespaceJobConfig>,

    #[serde(default)]
    pub settings: ScrapeSettings,
}

#[derive(Debug, Clone)]
pub struct DiscoveryJob {
    /// Service namespace, e.g. `AWS/EC2`
    pub job_type: String,
    pub regions: Vec<String>,
    pub roles: Vec<Role>,
    pub search_tags: Vec<SearchTag>,
    pub custom_tags: Vec<Tag>,
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Clone)]
pub struct StaticJob {
    pub name: String,
    pub namespace: String,
    pub regions: Vec<String>,
    pub roles: Vec<Role>,
    pub custom_tags: Vec<Tag>,
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Clone)]
pub struct CustomNamespaceJob {
    pub name: String,
    pub namespace: String,
    pub regions: Vec<String>,
    pub roles: Vec<Role>,
    pub custom_tags: Vec<Tag>,
    pub dimension_name_requirements: Vec<String>,
    pub metrics: Vec<MetricConfig>,
}

/// Validated, immutable job definitions consumed by the scrape engine
#[derive(Debug, Clone, Default)]
pub struct JobsConfig {
    pub discovery_jobs: Vec<DiscoveryJob>,
    pub static_jobs: Vec<StaticJob>,
    pub custom_namespace_jobs: Vec<CustomNamespaceJob>,
}

impl Config {
    /// Validate the raw configuration and turn it into [`JobsConfig`]
    pub fn resolve(&self) -> Result<JobsConfig, ConfigError> {
        if self.settings.metrics_per_query == 0 {
            return Err(ConfigError::ZeroSetting {
                field: "metrics_per_query",
            });
        }
        if self.settings.tagging_api_concurrency == 0 {
            return Err(ConfigError::ZeroSetting {
                field: "tagging_api_concurrency",
            });
        }
        if let Some(field) = self.settings.cloudwatch_concurrency.zero_limit() {
            return Err(ConfigError::ZeroSetting { field });
        }

        let discovery_jobs = self
            .discovery
            .iter()
            .map(resolve_discovery_job)
            .collect::<Result<Vec<_>, _>>()?;

        let static_jobs = self
            .static_jobs
            .iter()
            .map(|job| {
                check_regions(&job.name, &job.regions)?;
                check_metrics(&job.name, &job.metrics)?;
                Ok(StaticJob {
                    name: job.name.clone(),
                    namespace: job.namespace.clone(),
                    regions: job.regions.clone(),
                    roles: resolve_roles(&job.roles),
                    custom_tags: job.custom_tags.clone(),
                    dimensions: job.dimensions.clone(),
                    metrics: job.metrics.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let custom_namespace_jobs = self
            .custom_namespace
            .iter()
            .map(|job| {
                check_regions(&job.name, &job.regions)?;
                check_metrics(&job.name, &job.metrics)?;
                Ok(CustomNamespaceJob {
                    name: job.name.clone(),
                    namespace: job.namespace.clone(),
                    regions: job.regions.clone(),
                    roles: resolve_roles(&job.roles),
                    custom_tags: job.custom_tags.clone(),
                    dimension_name_requirements: job.dimension_name_requirements.clone(),
                    metrics: job.metrics.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(JobsConfig {
            discovery_jobs,
            static_jobs,
            custom_namespace_jobs,
        })
    }
}

fn resolve_discovery_job(job: &DiscoveryJobConfig) -> Result<DiscoveryJob, ConfigError> {
    let service = SUPPORTED_SERVICES
        .get_service(&job.job_type)
        .ok_or_else(|| ConfigError::UnknownJobType(job.job_type.clone()))?;

    check_regions(service.namespace, &job.regions)?;

    let search_tags = job
        .search_tags
        .iter()
        .map(|tag| {
            Regex::new(&tag.value)
                .map(|value| SearchTag {
                    key: tag.key.clone(),
                    value,
                })
                .map_err(|source| ConfigError::InvalidSearchTag {
                    key: tag.key.clone(),
                    pattern: tag.value.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DiscoveryJob {
        job_type: service.namespace.to_string(),
        regions: job.regions.clone(),
        roles: resolve_roles(&job.roles),
        search_tags,
        custom_tags: job.custom_tags.clone(),
        metrics: job.metrics.clone(),
    })
}

fn resolve_roles(roles: &[Role]) -> Vec<Role> {
    if roles.is_empty() {
        vec![Role::default()]
    } else {
        roles.to_vec()
    }
}

fn check_regions(job: &str, regions: &[String]) -> Result<(), ConfigError> {
    if regions.is_empty() {
        return Err(ConfigError::NoRegions {
            job: job.to_string(),
        });
    }
    Ok(())
}

fn check_metrics(job: &str, metrics: &[MetricConfig]) -> Result<(), ConfigError> {
    if metrics.is_empty() {
        return Err(ConfigError::NoMetrics {
            job: job.to_string(),
        });
    }
    Ok(())
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&file_content)
        .context("invalid configuration file provided")
        .inspect(|config| trace!("loaded config: {config:?}"))
}
