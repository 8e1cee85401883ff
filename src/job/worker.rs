//! Execution of a single (job, region, role) unit
//!
//! ```text
//! resolve account ─> discovery and/or metrics ─> JobContext ─> aggregator
//!        │ error
//!        └─> log, unit ends without output
//! ```
//!
//! Nothing in here retries; retries and backoff belong to the clients.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, error_span, field, warn};

use crate::clients::{ClientFactory, CloudwatchClient, TaggingClient};
use crate::config::{CustomNamespaceJob, DiscoveryJob, Role, ScrapeSettings, StaticJob};
use crate::discovery::DiscoveryError;
use crate::{CloudwatchData, CloudwatchMetricResult, JobContext, TaggedResource};

use super::aggregator::ResultAggregator;

#[derive(Debug, Clone)]
pub enum UnitJob {
    Discovery(Arc<DiscoveryJob>),
    Static(Arc<StaticJob>),
    CustomNamespace(Arc<CustomNamespaceJob>),
}

impl UnitJob {
    pub fn kind(&self) -> &'static str {
        match self {
            UnitJob::Discovery(_) => "discovery",
            UnitJob::Static(_) => "static",
            UnitJob::CustomNamespace(_) => "custom_namespace",
        }
    }

    /// Job type, static job name or custom namespace, whichever identifies the job
    pub fn label(&self) -> &str {
        match self {
            UnitJob::Discovery(job) => &job.job_type,
            UnitJob::Static(job) => &job.name,
            UnitJob::CustomNamespace(job) => &job.namespace,
        }
    }

    fn custom_tags(&self) -> &[crate::Tag] {
        match self {
            UnitJob::Discovery(job) => &job.custom_tags,
            UnitJob::Static(job) => &job.custom_tags,
            UnitJob::CustomNamespace(job) => &job.custom_tags,
        }
    }
}

/// One (job, region, role) triple
#[derive(Debug, Clone)]
pub struct ScrapeUnit {
    pub job: UnitJob,
    pub region: String,
    pub role: Role,
}

impl fmt::Display for ScrapeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = if self.role.role_arn.is_empty() {
            "<default credentials>"
        } else {
            self.role.role_arn.as_str()
        };
        write!(
            f,
            "{} {} region={} role={}",
            self.job.kind(),
            self.job.label(),
            self.region,
            role
        )
    }
}

impl ScrapeUnit {
    // Error level: the span must be enabled whenever unit errors are
    fn span(&self) -> Span {
        let arn = self.role.role_arn.as_str();
        let region = self.region.as_str();
        match &self.job {
            UnitJob::Discovery(job) => error_span!(
                "discovery_job",
                job_type = %job.job_type,
                region,
                arn,
                account = field::Empty
            ),
            UnitJob::Static(job) => error_span!(
                "static_job",
                static_job_name = %job.name,
                region,
                arn,
                account = field::Empty
            ),
            UnitJob::CustomNamespace(job) => error_span!(
                "custom_metric_namespace_job",
                custom_metric_namespace = %job.namespace,
                region,
                arn,
                account = field::Empty
            ),
        }
    }
}

/// What every unit of a scrape run shares
pub(crate) struct UnitEnv {
    pub factory: Arc<dyn ClientFactory>,
    pub settings: ScrapeSettings,
    pub aggregator: Arc<ResultAggregator>,
    pub cancel: CancellationToken,
}

/// Run one unit to a terminal state. Never fails; problems are logged.
pub(crate) async fn run_unit(unit: ScrapeUnit, env: Arc<UnitEnv>) {
    let span = unit.span();

    async {
        tokio::select! {
            _ = env.cancel.cancelled() => {
                warn!("scrape cancelled, abandoning unit");
            }
            _ = execute_unit(&unit, &env) => {}
        }
    }
    .instrument(span)
    .await
}

async fn execute_unit(unit: &ScrapeUnit, env: &UnitEnv) {
    let region = unit.region.as_str();
    let account_id = match env
        .factory
        .get_account_client(region, &unit.role)
        .get_account()
        .await
    {
        Ok(account_id) => account_id,
        Err(err) => {
            error!(error = %err, "Couldn't get account Id");
            return;
        }
    };
    Span::current().record("account", account_id.as_str());

    let settings = &env.settings;
    let cloudwatch = env.factory.get_cloudwatch_client(
        region,
        &unit.role,
        &settings.cloudwatch_concurrency,
    );

    let context = JobContext {
        region: region.to_string(),
        account_id,
        custom_tags: unit.job.custom_tags().to_vec(),
    };

    match &unit.job {
        UnitJob::Discovery(job) => {
            let tagging = env.factory.get_tagging_client(
                region,
                &unit.role,
                settings.tagging_api_concurrency,
            );

            let (resources, metrics) = run_discovery_job(
                job,
                region,
                tagging.as_ref(),
                cloudwatch.as_ref(),
                settings.metrics_per_query,
            )
            .await;

            let add_data_to_output = !metrics.is_empty()
                || (settings.flags.always_return_info_metrics && !resources.is_empty());

            if add_data_to_output {
                env.aggregator.add_discovery(
                    resources,
                    CloudwatchMetricResult {
                        context,
                        data: metrics,
                    },
                );
            } else {
                debug!("discovery produced no metrics, nothing to add");
            }
        }

        UnitJob::Static(job) => {
            let metrics = run_static_job(job, cloudwatch.as_ref()).await;
            env.aggregator.add_metrics(CloudwatchMetricResult {
                context,
                data: metrics,
            });
        }

        UnitJob::CustomNamespace(job) => {
            let metrics =
                run_custom_namespace_job(job, cloudwatch.as_ref(), settings.metrics_per_query)
                    .await;
            env.aggregator.add_metrics(CloudwatchMetricResult {
                context,
                data: metrics,
            });
        }
    }
}

/// Discover resources, then fetch their metrics.
///
/// A discovery failure yields no resources and no metrics. A metric failure
/// keeps the resources so they can still be reported as info-only.
pub async fn run_discovery_job(
    job: &DiscoveryJob,
    region: &str,
    tagging: &dyn TaggingClient,
    cloudwatch: &dyn CloudwatchClient,
    metrics_per_query: usize,
) -> (Vec<TaggedResource>, Vec<CloudwatchData>) {
    let resources = match tagging.get_resources(job, region).await {
        Ok(resources) => resources,
        Err(DiscoveryError::ExpectedToFindResources) => {
            error!("No tagged resources made it through filtering");
            return (Vec::new(), Vec::new());
        }
        Err(err) => {
            error!(error = %err, "Couldn't describe resources");
            return (Vec::new(), Vec::new());
        }
    };

    if resources.is_empty() {
        debug!("no tagged resources");
        return (resources, Vec::new());
    }
    debug!(total = resources.len(), "resources discovered");

    match cloudwatch
        .get_discovery_metrics(job, &resources, metrics_per_query)
        .await
    {
        Ok(metrics) => (resources, metrics),
        Err(err) => {
            error!(error = %err, "Failed to get metric data");
            (resources, Vec::new())
        }
    }
}

pub async fn run_static_job(
    job: &StaticJob,
    cloudwatch: &dyn CloudwatchClient,
) -> Vec<CloudwatchData> {
    cloudwatch
        .get_static_metrics(job)
        .await
        .unwrap_or_else(|err| {
            error!(error = %err, "Failed to get static metrics");
            Vec::new()
        })
}

pub async fn run_custom_namespace_job(
    job: &CustomNamespaceJob,
    cloudwatch: &dyn CloudwatchClient,
    metrics_per_query: usize,
) -> Vec<CloudwatchData> {
    cloudwatch
        .get_custom_namespace_metrics(job, metrics_per_query)
        .await
        .unwrap_or_else(|err| {
            error!(error = %err, "Failed to get custom namespace metrics");
            Vec::new()
        })
}
