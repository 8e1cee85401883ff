//! Failure and cancellation tests for the scrape engine
//!
//! These tests verify that a failing unit never takes its siblings down:
//! - Account resolution failures
//! - Discovery failures
//! - Metric retrieval failures
//! - Cancellation with units stuck in flight

use std::time::Duration;

use cloudscrape::config::ScrapeSettings;
use cloudscrape::job::scrape_aws_data;
use tokio_util::sync::CancellationToken;

use crate::helpers::*;

#[tokio::test]
async fn test_account_failure_is_isolated() {
    let jobs = jobs(vec![], vec![static_job("nat", region_list(3))], vec![]);
    let factory = MockFactory::new(0, 1).fail_account("region-1").into_arc();

    let results = scrape_aws_data(
        &jobs,
        factory,
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    let mut regions: Vec<_> = results
        .metrics
        .iter()
        .map(|m| m.context.region.as_str())
        .collect();
    regions.sort();
    assert_eq!(regions, vec!["region-0", "region-2"]);
}

#[tokio::test]
async fn test_account_failure_skips_metric_calls() {
    let jobs = jobs(vec![], vec![static_job("nat", region_list(2))], vec![]);
    let factory = MockFactory::new(0, 1).fail_account("region-0");
    let metric_calls = factory.metric_calls.clone();

    let results = scrape_aws_data(
        &jobs,
        factory.into_arc(),
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(results.metrics.len(), 1);
    assert_eq!(metric_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_every_unit_failing_yields_empty_results() {
    let regions = region_list(3);
    let jobs = jobs(
        vec![discovery_job("AWS/EC2", regions.clone())],
        vec![static_job("nat", regions.clone())],
        vec![],
    );
    let factory = regions
        .iter()
        .fold(MockFactory::new(2, 1), |factory, region| {
            factory.fail_account(region)
        })
        .into_arc();

    let results = scrape_aws_data(
        &jobs,
        factory,
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    assert!(results.resources.is_empty());
    assert!(results.metrics.is_empty());
}

#[tokio::test]
async fn test_discovery_failure_is_isolated() {
    let jobs = jobs(vec![discovery_job("AWS/EC2", region_list(3))], vec![], vec![]);
    let factory = MockFactory::new(2, 1).fail_discovery("region-2").into_arc();

    let results = scrape_aws_data(
        &jobs,
        factory,
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(results.resources.len(), 2);
    assert_eq!(results.metrics.len(), 2);
    assert!(
        results
            .metrics
            .iter()
            .all(|m| m.context.region != "region-2")
    );
}

#[tokio::test]
async fn test_discovery_metric_failure_keeps_info_only_resources() {
    let jobs = jobs(vec![discovery_job("AWS/EC2", region_list(1))], vec![], vec![]);
    let mut factory = MockFactory::new(3, 1);
    factory.failing_metrics = true;

    let mut settings = ScrapeSettings::default();
    settings.flags.always_return_info_metrics = true;

    let results =
        scrape_aws_data(&jobs, factory.into_arc(), settings, CancellationToken::new()).await;

    assert_eq!(results.resources.len(), 1);
    assert_eq!(results.resources[0].len(), 3);
    assert_eq!(results.metrics.len(), 1);
    assert!(results.metrics[0].data.is_empty());
}

#[tokio::test]
async fn test_static_metric_failure_still_reports_context() {
    let jobs = jobs(vec![], vec![static_job("nat", region_list(1))], vec![]);
    let mut factory = MockFactory::new(0, 1);
    factory.failing_metrics = true;

    let results = scrape_aws_data(
        &jobs,
        factory.into_arc(),
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(results.metrics.len(), 1);
    assert_eq!(results.metrics[0].context.account_id, account_for("region-0"));
    assert!(results.metrics[0].data.is_empty());
}

#[tokio::test]
async fn test_cancellation_abandons_hanging_units() {
    let jobs = jobs(vec![], vec![static_job("nat", region_list(4))], vec![]);
    let factory = MockFactory::new(0, 1)
        .hang_account("region-0")
        .hang_account("region-3")
        .into_arc();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let results = tokio::time::timeout(
        Duration::from_secs(5),
        scrape_aws_data(&jobs, factory, ScrapeSettings::default(), cancel),
    )
    .await
    .expect("scrape should return after cancellation");

    let mut regions: Vec<_> = results
        .metrics
        .iter()
        .map(|m| m.context.region.as_str())
        .collect();
    regions.sort();
    assert_eq!(regions, vec!["region-1", "region-2"]);
}

#[tokio::test]
async fn test_cancelled_before_start_returns_empty() {
    let jobs = jobs(vec![], vec![static_job("nat", region_list(3))], vec![]);
    let factory = MockFactory::new(0, 1)
        .delay_account("region-0", Duration::from_millis(50))
        .delay_account("region-1", Duration::from_millis(50))
        .delay_account("region-2", Duration::from_millis(50))
        .into_arc();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let results = scrape_aws_data(&jobs, factory, ScrapeSettings::default(), cancel).await;

    assert!(results.metrics.is_empty());
    assert!(results.resources.is_empty());
}
