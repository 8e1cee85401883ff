//! Resource discovery
//!
//! Turns a discovery job into the set of resources it targets in one region:
//!
//! ```text
//! tag listing (paged, search tags applied) ─┐
//!                                           ├─> merged ─> FilterFunc ─> non-empty check
//! ResourceFunc (extension, optional) ───────┘
//! ```
//!
//! A service that declares any discovery mechanism but ends up with zero
//! resources is reported as [`DiscoveryError::ExpectedToFindResources`]:
//! an empty tag listing almost always means missing permissions or wrong
//! filters rather than an account without resources.

pub mod extensions;
pub mod paginator;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::clients::{
    ClientError, GetResourcesInput, ResourceGroupsTaggingApi, ServiceApi, TaggingClient,
};
use crate::config::DiscoveryJob;
use crate::TaggedResource;
use crate::services::{SUPPORTED_SERVICES, SupportedServices};

pub use extensions::{ExtensionRegistry, FilterFunc, ResourceFunc, ServiceExtension};
pub use paginator::{GetResourcesPaginator, MAX_RESOURCES_PER_PAGE};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("no supported service for job type {0}")]
    UnknownService(String),

    #[error("failed to apply ResourceFunc for {namespace}: {source}")]
    ResourceFunc {
        namespace: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to apply FilterFunc for {namespace}: {source}")]
    FilterFunc {
        namespace: String,
        #[source]
        source: ClientError,
    },

    #[error("expected to discover resources but none were found")]
    ExpectedToFindResources,
}

/// Discovery client for one region and role
///
/// Combines the generic tag listing API with the extension hooks registered
/// for the job's namespace.
pub struct DiscoveryClient {
    tagging_api: Arc<dyn ResourceGroupsTaggingApi>,
    service_api: Arc<dyn ServiceApi>,
    extensions: Arc<ExtensionRegistry>,
    services: SupportedServices,

    /// Number of tag listing pages requested so far
    tagging_api_requests: AtomicU64,
}

impl DiscoveryClient {
    pub fn new(
        tagging_api: Arc<dyn ResourceGroupsTaggingApi>,
        service_api: Arc<dyn ServiceApi>,
    ) -> Self {
        Self {
            tagging_api,
            service_api,
            extensions: ExtensionRegistry::builtin(),
            services: SUPPORTED_SERVICES,
            tagging_api_requests: AtomicU64::new(0),
        }
    }

    pub fn with_extensions(mut self, extensions: Arc<ExtensionRegistry>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_services(mut self, services: SupportedServices) -> Self {
        self.services = services;
        self
    }

    pub fn service_api(&self) -> &dyn ServiceApi {
        self.service_api.as_ref()
    }

    pub fn tagging_api_requests(&self) -> u64 {
        self.tagging_api_requests.load(Ordering::Relaxed)
    }

    async fn list_tagged_resources(
        &self,
        job: &DiscoveryJob,
        region: &str,
        filters: &[&str],
    ) -> Result<Vec<TaggedResource>, DiscoveryError> {
        let input = GetResourcesInput {
            resource_type_filters: filters.iter().map(|f| f.to_string()).collect(),
            resources_per_page: MAX_RESOURCES_PER_PAGE,
            pagination_token: None,
        };

        let mut paginator = GetResourcesPaginator::new(self.tagging_api.as_ref(), input);
        let mut resources = Vec::new();

        while paginator.has_more_pages() {
            self.tagging_api_requests.fetch_add(1, Ordering::Relaxed);
            let page = paginator.next_page().await?;

            for mapping in page.resource_tag_mapping_list {
                let resource = TaggedResource {
                    arn: mapping.resource_arn,
                    namespace: job.job_type.clone(),
                    region: region.to_string(),
                    tags: mapping.tags,
                };

                if resource.filter_through_tags(&job.search_tags) {
                    resources.push(resource);
                } else {
                    debug!(
                        arn = %resource.arn,
                        "skipping resource because search tags do not match"
                    );
                }
            }
        }

        debug!(total = resources.len(), "tag listing finished");
        Ok(resources)
    }
}

#[async_trait]
impl TaggingClient for DiscoveryClient {
    #[instrument(skip_all, fields(job_type = %job.job_type, region = %region))]
    async fn get_resources(
        &self,
        job: &DiscoveryJob,
        region: &str,
    ) -> Result<Vec<TaggedResource>, DiscoveryError> {
        let svc = self
            .services
            .get_service(&job.job_type)
            .ok_or_else(|| DiscoveryError::UnknownService(job.job_type.clone()))?;

        let mut resources = Vec::new();
        let mut should_have_discovered_resources = false;

        if !svc.resource_filters.is_empty() {
            should_have_discovered_resources = true;
            resources = self
                .list_tagged_resources(job, region, svc.resource_filters)
                .await?;
        }

        if let Some(ext) = self.extensions.get(svc.namespace) {
            if let Some(resource_func) = &ext.resource_func {
                should_have_discovered_resources = true;
                let extra = resource_func
                    .resources(self, job, region)
                    .await
                    .map_err(|source| DiscoveryError::ResourceFunc {
                        namespace: svc.namespace.to_string(),
                        source,
                    })?;
                resources.extend(extra);
                debug!(total = resources.len(), "ResourceFunc finished");
            }

            if let Some(filter_func) = &ext.filter_func {
                resources = filter_func.filter(self, resources).await.map_err(|source| {
                    DiscoveryError::FilterFunc {
                        namespace: svc.namespace.to_string(),
                        source,
                    }
                })?;
                debug!(total = resources.len(), "FilterFunc finished");
            }
        }

        if should_have_discovered_resources && resources.is_empty() {
            return Err(DiscoveryError::ExpectedToFindResources);
        }

        Ok(resources)
    }
}
