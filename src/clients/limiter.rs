//! Concurrency-limited client wrappers
//!
//! The scrape engine fans out without any global throttle. Client factories
//! wrap the clients they hand out in these types so that the number of
//! in-flight calls per client stays below the configured ceiling.
//!
//! With per-API limits enabled, each metric operation is gated by the limit of
//! the CloudWatch API it starts with:
//!
//! | operation | limit |
//! |-----------|-------|
//! | discovery metrics | `get_metric_data` |
//! | static metrics | `get_metric_statistics` |
//! | custom namespace metrics | `list_metrics` |
//!
//! Otherwise all three share one semaphore sized by `single_limit`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::trace;

use crate::config::{CloudwatchConcurrency, CustomNamespaceJob, DiscoveryJob, StaticJob};
use crate::discovery::DiscoveryError;
use crate::{CloudwatchData, TaggedResource};

use super::{ClientError, ClientResult, CloudwatchClient, TaggingClient};

pub struct LimitedConcurrencyTaggingClient {
    client: Arc<dyn TaggingClient>,
    sem: Semaphore,
}

impl LimitedConcurrencyTaggingClient {
    pub fn new(client: Arc<dyn TaggingClient>, max_concurrency: usize) -> Self {
        Self {
            client,
            sem: Semaphore::new(max_concurrency.max(1)),
        }
    }
}

#[async_trait]
impl TaggingClient for LimitedConcurrencyTaggingClient {
    async fn get_resources(
        &self,
        job: &DiscoveryJob,
        region: &str,
    ) -> Result<Vec<TaggedResource>, DiscoveryError> {
        let _permit = self.sem.acquire().await.map_err(|_| ClientError::Closed)?;
        trace!("acquired tagging permit");
        self.client.get_resources(job, region).await
    }
}

pub struct LimitedConcurrencyCloudwatchClient {
    client: Arc<dyn CloudwatchClient>,
    list_metrics: Arc<Semaphore>,
    get_metric_data: Arc<Semaphore>,
    get_metric_statistics: Arc<Semaphore>,
}

impl LimitedConcurrencyCloudwatchClient {
    pub fn new(client: Arc<dyn CloudwatchClient>, concurrency: &CloudwatchConcurrency) -> Self {
        let permits = |limit: usize| Arc::new(Semaphore::new(limit.max(1)));

        if concurrency.per_api_limit_enabled {
            Self {
                client,
                list_metrics: permits(concurrency.list_metrics),
                get_metric_data: permits(concurrency.get_metric_data),
                get_metric_statistics: permits(concurrency.get_metric_statistics),
            }
        } else {
            let shared = permits(concurrency.single_limit);
            Self {
                client,
                list_metrics: shared.clone(),
                get_metric_data: shared.clone(),
                get_metric_statistics: shared,
            }
        }
    }
}

#[async_trait]
impl CloudwatchClient for LimitedConcurrencyCloudwatchClient {
    async fn get_discovery_metrics(
        &self,
        job: &DiscoveryJob,
        resources: &[TaggedResource],
        metrics_per_query: usize,
    ) -> ClientResult<Vec<CloudwatchData>> {
        let _permit = self
            .get_metric_data
            .acquire()
            .await
            .map_err(|_| ClientError::Closed)?;
        self.client
            .get_discovery_metrics(job, resources, metrics_per_query)
            .await
    }

    async fn get_static_metrics(&self, job: &StaticJob) -> ClientResult<Vec<CloudwatchData>> {
        let _permit = self
            .get_metric_statistics
            .acquire()
            .await
            .map_err(|_| ClientError::Closed)?;
        self.client.get_static_metrics(job).await
    }

    async fn get_custom_namespace_metrics(
        &self,
        job: &CustomNamespaceJob,
        metrics_per_query: usize,
    ) -> ClientResult<Vec<CloudwatchData>> {
        let _permit = self
            .list_metrics
            .acquire()
            .await
            .map_err(|_| ClientError::Closed)?;
        self.client
            .get_custom_namespace_metrics(job, metrics_per_query)
            .await
    }
}
