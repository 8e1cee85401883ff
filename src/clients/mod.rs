//! Collaborator contracts consumed by the scrape engine
//!
//! The engine never talks to a cloud SDK directly. Everything it needs is
//! expressed as a trait here, and a [`ClientFactory`] hands out scoped
//! instances per (region, role):
//!
//! - [`AccountClient`]: resolves the account ID behind a role
//! - [`ResourceGroupsTaggingApi`]: the raw, paginated tag listing API
//! - [`ServiceApi`]: per-service listing calls used by extension hooks
//! - [`TaggingClient`]: resource discovery for a discovery job
//! - [`CloudwatchClient`]: metric retrieval, opaque to the engine
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; instances are shared across the
//! concurrently running units behind `Arc`.

pub mod error;
pub mod limiter;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{CloudwatchConcurrency, CustomNamespaceJob, DiscoveryJob, Role, StaticJob};
use crate::discovery::DiscoveryError;
use crate::{CloudwatchData, Tag, TaggedResource};

pub use error::{ClientError, ClientResult};
pub use limiter::{LimitedConcurrencyCloudwatchClient, LimitedConcurrencyTaggingClient};

#[async_trait]
pub trait AccountClient: Send + Sync {
    /// Resolve the account ID of the assumed identity
    async fn get_account(&self) -> ClientResult<String>;
}

/// One request against the tag listing API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResourcesInput {
    pub resource_type_filters: Vec<String>,
    pub resources_per_page: i32,

    /// Continuation token from the previous page, `None` for the first page
    pub pagination_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTagMapping {
    pub resource_arn: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetResourcesOutput {
    pub resource_tag_mapping_list: Vec<ResourceTagMapping>,

    /// Token for the next page; `None` or empty when there are no more pages
    pub pagination_token: Option<String>,
}

/// Paginated, side-effect free tag listing API
#[async_trait]
pub trait ResourceGroupsTaggingApi: Send + Sync {
    async fn get_resources(&self, input: &GetResourcesInput) -> ClientResult<GetResourcesOutput>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoScalingGroup {
    pub arn: String,
    pub name: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotFleetRequest {
    pub id: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestApi {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpApi {
    pub api_id: String,
    pub name: String,
}

/// Service specific listing calls for resources the tag API cannot see
///
/// Every method defaults to [`ClientError::Unsupported`] so that clients only
/// implement what their region or role actually exposes.
#[async_trait]
pub trait ServiceApi: Send + Sync {
    async fn describe_auto_scaling_groups(&self) -> ClientResult<Vec<AutoScalingGroup>> {
        Err(ClientError::Unsupported("DescribeAutoScalingGroups"))
    }

    async fn describe_spot_fleet_requests(&self) -> ClientResult<Vec<SpotFleetRequest>> {
        Err(ClientError::Unsupported("DescribeSpotFleetRequests"))
    }

    async fn get_rest_apis(&self) -> ClientResult<Vec<RestApi>> {
        Err(ClientError::Unsupported("GetRestApis"))
    }

    async fn get_http_apis(&self) -> ClientResult<Vec<HttpApi>> {
        Err(ClientError::Unsupported("GetApis"))
    }
}

/// A [`ServiceApi`] that supports nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoServiceApi;

impl ServiceApi for NoServiceApi {}

/// Resource discovery for one region and role
#[async_trait]
pub trait TaggingClient: Send + Sync {
    async fn get_resources(
        &self,
        job: &DiscoveryJob,
        region: &str,
    ) -> Result<Vec<TaggedResource>, DiscoveryError>;
}

/// Metric retrieval for one region and role
///
/// How datapoints are requested and batched is up to the implementation; the
/// scrape engine only hands over what to collect.
#[async_trait]
pub trait CloudwatchClient: Send + Sync {
    async fn get_discovery_metrics(
        &self,
        job: &DiscoveryJob,
        resources: &[TaggedResource],
        metrics_per_query: usize,
    ) -> ClientResult<Vec<CloudwatchData>>;

    async fn get_static_metrics(&self, job: &StaticJob) -> ClientResult<Vec<CloudwatchData>>;

    async fn get_custom_namespace_metrics(
        &self,
        job: &CustomNamespaceJob,
        metrics_per_query: usize,
    ) -> ClientResult<Vec<CloudwatchData>>;
}

/// Hands out clients scoped to a region and role
///
/// Implementations own credential handling and are expected to cache clients
/// where that is cheaper than building new ones.
pub trait ClientFactory: Send + Sync {
    fn get_account_client(&self, region: &str, role: &Role) -> Arc<dyn AccountClient>;

    fn get_tagging_client(
        &self,
        region: &str,
        role: &Role,
        concurrency: usize,
    ) -> Arc<dyn TaggingClient>;

    fn get_cloudwatch_client(
        &self,
        region: &str,
        role: &Role,
        concurrency: &CloudwatchConcurrency,
    ) -> Arc<dyn CloudwatchClient>;
}
