//! Concurrent scrape of every configured job
//!
//! Every (job, role, region) triple becomes its own tokio task. There is no
//! throttle at this level: the clients handed out by the [`ClientFactory`]
//! carry their own concurrency limits.
//!
//! ## Failure isolation
//!
//! A unit that fails (account resolution, discovery, metric retrieval) logs
//! with its job, region and role and ends without output. Siblings keep
//! running and [`scrape_aws_data`] itself never fails.
//!
//! ## Cancellation
//!
//! Cancelling the token makes every unit abandon its in-flight call at the next
//! suspension point. The scrape still waits for all units before returning the
//! results gathered so far.

pub mod aggregator;
pub mod worker;

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::clients::ClientFactory;
use crate::config::{JobsConfig, Role, ScrapeSettings};

pub use aggregator::{ResultAggregator, ScrapeResults};
pub use worker::{
    ScrapeUnit, UnitJob, run_custom_namespace_job, run_discovery_job, run_static_job,
};

use worker::{UnitEnv, run_unit};

/// Enumerate every (job, role, region) triple of the configuration
pub fn plan_units(jobs: &JobsConfig) -> Vec<ScrapeUnit> {
    let mut units = Vec::new();

    for job in &jobs.discovery_jobs {
        let job = Arc::new(job.clone());
        push_units(&mut units, UnitJob::Discovery(job.clone()), &job.roles, &job.regions);
    }

    for job in &jobs.static_jobs {
        let job = Arc::new(job.clone());
        push_units(&mut units, UnitJob::Static(job.clone()), &job.roles, &job.regions);
    }

    for job in &jobs.custom_namespace_jobs {
        let job = Arc::new(job.clone());
        push_units(
            &mut units,
            UnitJob::CustomNamespace(job.clone()),
            &job.roles,
            &job.regions,
        );
    }

    units
}

fn push_units(
    units: &mut Vec<ScrapeUnit>,
    job: UnitJob,
    roles: &[Role],
    regions: &[String],
) {
    for role in roles {
        for region in regions {
            units.push(ScrapeUnit {
                job: job.clone(),
                region: region.clone(),
                role: role.clone(),
            });
        }
    }
}

/// Scrape every job in every region with every role, concurrently.
///
/// Returns once every unit has finished or given up on cancellation.
#[instrument(skip_all)]
pub async fn scrape_aws_data(
    jobs: &JobsConfig,
    factory: Arc<dyn ClientFactory>,
    settings: ScrapeSettings,
    cancel: CancellationToken,
) -> ScrapeResults {
    let aggregator = Arc::new(ResultAggregator::new());
    let env = Arc::new(UnitEnv {
        factory,
        settings,
        aggregator: aggregator.clone(),
        cancel,
    });

    let units = plan_units(jobs);
    let unit_count = units.len();
    info!(units = unit_count, "starting scrape");

    let mut tasks = JoinSet::new();
    for unit in units {
        tasks.spawn(run_unit(unit, env.clone()));
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            error!("scrape unit aborted: {err}");
        }
    }

    let results = aggregator.take();
    info!(
        units = unit_count,
        resource_batches = results.resources.len(),
        metric_results = results.metrics.len(),
        "scrape finished"
    );
    results
}
