//! Concurrency tests for the scrape engine
//!
//! These tests verify fan-out and aggregation under parallel load:
//! - Every unit runs as its own task with no global throttle
//! - Results from many concurrent units are all kept
//! - Client-level limits bound in-flight calls

use std::sync::atomic::Ordering;
use std::time::Duration;

use cloudscrape::config::ScrapeSettings;
use cloudscrape::job::scrape_aws_data;
use tokio_util::sync::CancellationToken;

use crate::helpers::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_hundred_units_with_one_failure() {
    let jobs = jobs(vec![], vec![static_job("nat", region_list(100))], vec![]);
    let factory = MockFactory::new(0, 2).fail_account("region-42");
    let account_calls = factory.account_calls.clone();

    let results = scrape_aws_data(
        &jobs,
        factory.into_arc(),
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(account_calls.load(Ordering::SeqCst), 100);
    assert_eq!(results.metrics.len(), 99);
    assert!(results.metrics.iter().all(|m| m.data.len() == 2));
    assert!(
        results
            .metrics
            .iter()
            .all(|m| m.context.region != "region-42")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_units_fan_out_without_global_limit() {
    let unit_count = 20;
    let jobs = jobs(
        vec![discovery_job("AWS/EC2", region_list(unit_count / 2))],
        vec![static_job("nat", region_list(unit_count / 2))],
        vec![],
    );
    let mut factory = MockFactory::new(1, 1);
    factory.account_delay = Some(Duration::from_millis(200));
    let in_flight = factory.account_in_flight.clone();

    let results = scrape_aws_data(
        &jobs,
        factory.into_arc(),
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(in_flight.peak(), unit_count);
    assert_eq!(results.resources.len(), unit_count / 2);
    assert_eq!(results.metrics.len(), unit_count);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_discovery_batches_stay_separate() {
    let jobs = jobs(
        vec![
            discovery_job("AWS/EC2", region_list(10)),
            discovery_job("AWS/RDS", region_list(10)),
        ],
        vec![],
        vec![],
    );
    let factory = MockFactory::new(3, 1).into_arc();

    let results = scrape_aws_data(
        &jobs,
        factory,
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(results.resources.len(), 20);
    for batch in &results.resources {
        assert_eq!(batch.len(), 3);
        let namespace = &batch[0].namespace;
        let region = &batch[0].region;
        assert!(
            batch
                .iter()
                .all(|r| &r.namespace == namespace && &r.region == region)
        );
    }
}
