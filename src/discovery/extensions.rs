//! Per-namespace hooks that augment generic tag based discovery
//!
//! Some services cannot be discovered through the tag listing API at all
//! (auto scaling groups, spot fleets), and some return resources that need
//! rewriting before their metrics can be matched (API Gateway). Each namespace
//! may register:
//!
//! - a [`ResourceFunc`] producing additional resources, run after the tag listing
//! - a [`FilterFunc`] receiving the full merged collection and replacing it
//!
//! The registry is built once and never mutated afterwards.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use tracing::debug;

use crate::TaggedResource;
use crate::clients::ClientResult;
use crate::config::DiscoveryJob;

use super::DiscoveryClient;

#[async_trait]
pub trait ResourceFunc: Send + Sync {
    async fn resources(
        &self,
        client: &DiscoveryClient,
        job: &DiscoveryJob,
        region: &str,
    ) -> ClientResult<Vec<TaggedResource>>;
}

#[async_trait]
pub trait FilterFunc: Send + Sync {
    async fn filter(
        &self,
        client: &DiscoveryClient,
        resources: Vec<TaggedResource>,
    ) -> ClientResult<Vec<TaggedResource>>;
}

/// Hooks registered for one namespace
#[derive(Clone, Default)]
pub struct ServiceExtension {
    pub resource_func: Option<Arc<dyn ResourceFunc>>,
    pub filter_func: Option<Arc<dyn FilterFunc>>,
}

impl ServiceExtension {
    pub fn with_resource_func(mut self, func: impl ResourceFunc + 'static) -> Self {
        self.resource_func = Some(Arc::new(func));
        self
    }

    pub fn with_filter_func(mut self, func: impl FilterFunc + 'static) -> Self {
        self.filter_func = Some(Arc::new(func));
        self
    }
}

impl std::fmt::Debug for ServiceExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceExtension")
            .field("resource_func", &self.resource_func.is_some())
            .field("filter_func", &self.filter_func.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    entries: HashMap<String, ServiceExtension>,
}

static BUILTIN: LazyLock<Arc<ExtensionRegistry>> = LazyLock::new(|| {
    Arc::new(
        ExtensionRegistry::new()
            .with(
                "AWS/ApiGateway",
                ServiceExtension::default().with_filter_func(ApiGatewayFilter),
            )
            .with(
                "AWS/AutoScaling",
                ServiceExtension::default().with_resource_func(AutoScalingResources),
            )
            .with(
                "AWS/EC2Spot",
                ServiceExtension::default().with_resource_func(SpotFleetResources),
            ),
    )
});

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hooks shipped with the crate
    pub fn builtin() -> Arc<Self> {
        BUILTIN.clone()
    }

    pub fn with(mut self, namespace: impl Into<String>, extension: ServiceExtension) -> Self {
        self.entries.insert(namespace.into(), extension);
        self
    }

    pub fn get(&self, namespace: &str) -> Option<&ServiceExtension> {
        self.entries.get(namespace)
    }
}

/// Auto scaling groups carry their own tags and are not listed by the tag API
pub struct AutoScalingResources;

#[async_trait]
impl ResourceFunc for AutoScalingResources {
    async fn resources(
        &self,
        client: &DiscoveryClient,
        job: &DiscoveryJob,
        region: &str,
    ) -> ClientResult<Vec<TaggedResource>> {
        let groups = client.service_api().describe_auto_scaling_groups().await?;

        let resources = groups
            .into_iter()
            .map(|group| TaggedResource {
                arn: group.arn,
                namespace: job.job_type.clone(),
                region: region.to_string(),
                tags: group.tags,
            })
            .filter(|resource| {
                let keep = resource.filter_through_tags(&job.search_tags);
                if !keep {
                    debug!(
                        arn = %resource.arn,
                        "skipping auto scaling group, search tags do not match"
                    );
                }
                keep
            })
            .collect();

        Ok(resources)
    }
}

/// Spot fleet requests are identified by their request ID rather than an ARN
pub struct SpotFleetResources;

#[async_trait]
impl ResourceFunc for SpotFleetResources {
    async fn resources(
        &self,
        client: &DiscoveryClient,
        job: &DiscoveryJob,
        region: &str,
    ) -> ClientResult<Vec<TaggedResource>> {
        let requests = client.service_api().describe_spot_fleet_requests().await?;

        Ok(requests
            .into_iter()
            .map(|request| TaggedResource {
                arn: request.id,
                namespace: job.job_type.clone(),
                region: region.to_string(),
                tags: request.tags,
            })
            .filter(|resource| resource.filter_through_tags(&job.search_tags))
            .collect())
    }
}

/// Keeps only API resources, naming REST APIs the way CloudWatch does.
///
/// REST API metrics are dimensioned by API name, so `.../restapis/<id>` ARNs
/// are rewritten to `.../restapis/<name>`. HTTP and WebSocket APIs keep their
/// ARNs. Stages and every other API Gateway resource are dropped.
pub struct ApiGatewayFilter;

#[async_trait]
impl FilterFunc for ApiGatewayFilter {
    async fn filter(
        &self,
        client: &DiscoveryClient,
        resources: Vec<TaggedResource>,
    ) -> ClientResult<Vec<TaggedResource>> {
        let rest_apis = client.service_api().get_rest_apis().await?;
        let http_apis = client.service_api().get_http_apis().await?;

        let filtered = resources
            .into_iter()
            .filter_map(|mut resource| {
                if let Some(api) = rest_apis
                    .iter()
                    .find(|api| resource.arn.ends_with(&format!("/restapis/{}", api.id)))
                {
                    let prefix_len = resource.arn.len() - api.id.len();
                    resource.arn.truncate(prefix_len);
                    resource.arn.push_str(&api.name);
                    return Some(resource);
                }

                http_apis
                    .iter()
                    .any(|api| resource.arn.ends_with(&format!("/apis/{}", api.api_id)))
                    .then_some(resource)
            })
            .collect();

        Ok(filtered)
    }
}
