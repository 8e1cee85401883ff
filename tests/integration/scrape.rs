//! End-to-end scrape tests
//!
//! These tests drive `scrape_aws_data` against mock collaborators and check
//! what ends up in the aggregated results:
//! - Aggregation completeness across job kinds
//! - Inclusion policy for discovery units
//! - Job context stamping
//! - Unit planning over roles and regions

use std::time::Duration;

use cloudscrape::clients::ResourceTagMapping;
use cloudscrape::config::ScrapeSettings;
use cloudscrape::job::{UnitJob, plan_units, scrape_aws_data};
use cloudscrape::Tag;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use crate::helpers::*;

#[tokio::test]
async fn test_aggregation_completeness() {
    let regions = region_list(3);
    let jobs = jobs(
        vec![discovery_job("AWS/EC2", regions.clone())],
        vec![static_job("nat", regions[..2].to_vec())],
        vec![],
    );

    // Stagger completion so results arrive out of planning order
    let factory = MockFactory::new(2, 1)
        .delay_account("region-0", Duration::from_millis(60))
        .delay_account("region-1", Duration::from_millis(30))
        .into_arc();

    let results = scrape_aws_data(
        &jobs,
        factory,
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(results.resources.len(), 3);
    assert!(results.resources.iter().all(|batch| batch.len() == 2));
    assert_eq!(results.metrics.len(), 5);
}

#[tokio::test]
async fn test_job_context_is_resolved_per_unit() {
    let jobs = jobs(vec![], vec![static_job("nat", region_list(2))], vec![]);
    let factory = MockFactory::new(0, 1).into_arc();

    let results = scrape_aws_data(
        &jobs,
        factory,
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    let mut contexts: Vec<_> = results
        .metrics
        .iter()
        .map(|m| (m.context.region.clone(), m.context.account_id.clone()))
        .collect();
    contexts.sort();

    assert_eq!(
        contexts,
        vec![
            ("region-0".to_string(), account_for("region-0")),
            ("region-1".to_string(), account_for("region-1")),
        ]
    );
    assert!(results
        .metrics
        .iter()
        .all(|m| m.context.custom_tags == vec![Tag::new("source", "static")]));
}

#[tokio::test]
async fn test_discovery_without_metrics_is_dropped() {
    let jobs = jobs(vec![discovery_job("AWS/EC2", region_list(2))], vec![], vec![]);
    let factory = MockFactory::new(2, 0).into_arc();

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
async fn test_info_only_resources_with_flag() {
    let jobs = jobs(vec![discovery_job("AWS/EC2", region_list(2))], vec![], vec![]);
    let factory = MockFactory::new(2, 0).into_arc();

    let mut settings = ScrapeSettings::default();
    settings.flags.always_return_info_metrics = true;

    let results = scrape_aws_data(&jobs, factory, settings, CancellationToken::new()).await;

    assert_eq!(results.resources.len(), 2);
    assert_eq!(results.metrics.len(), 2);
    assert!(results.metrics.iter().all(|m| m.data.is_empty()));
}

#[tokio::test]
async fn test_info_flag_needs_resources() {
    let jobs = jobs(vec![discovery_job("AWS/EC2", region_list(1))], vec![], vec![]);
    let factory = MockFactory::new(0, 0).into_arc();

    let mut settings = ScrapeSettings::default();
    settings.flags.always_return_info_metrics = true;

    let results = scrape_aws_data(&jobs, factory, settings, CancellationToken::new()).await;

    assert!(results.resources.is_empty());
    assert!(results.metrics.is_empty());
}

#[tokio::test]
async fn test_static_and_custom_namespace_always_contribute() {
    let jobs = jobs(
        vec![],
        vec![static_job("nat", region_list(1))],
        vec![custom_namespace_job("MyApp", region_list(2))],
    );
    let mut factory = MockFactory::new(0, 0);
    factory.failing_metrics = true;

    let results = scrape_aws_data(
        &jobs,
        factory.into_arc(),
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    assert!(results.resources.is_empty());
    assert_eq!(results.metrics.len(), 3);
    assert!(results.metrics.iter().all(|m| m.data.is_empty()));
}

#[tokio::test]
async fn test_real_discovery_client_end_to_end() {
    let mut discovery = discovery_job("AWS/EC2", region_list(1));
    discovery.search_tags = vec![cloudscrape::tags::SearchTag {
        key: "env".to_string(),
        value: regex::Regex::new("^prod$").unwrap(),
    }];

    let mut factory = MockFactory::new(0, 1);
    factory.tag_listing = Some(vec![
        ResourceTagMapping {
            resource_arn: "arn:aws:ec2:region-0:1:instance/i-prod".to_string(),
            tags: vec![Tag::new("env", "prod")],
        },
        ResourceTagMapping {
            resource_arn: "arn:aws:ec2:region-0:1:instance/i-dev".to_string(),
            tags: vec![Tag::new("env", "dev")],
        },
    ]);

    let results = scrape_aws_data(
        &jobs(vec![discovery], vec![], vec![]),
        factory.into_arc(),
        ScrapeSettings::default(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(results.resources.len(), 1);
    assert_eq!(results.resources[0].len(), 1);
    assert_eq!(
        results.resources[0][0].arn,
        "arn:aws:ec2:region-0:1:instance/i-prod"
    );
    assert_eq!(results.resources[0][0].namespace, "AWS/EC2");
}

#[test]
fn test_plan_units_covers_every_triple() {
    let mut discovery = discovery_job("AWS/EC2", region_list(3));
    discovery.roles = vec![role("arn:aws:iam::1:role/a"), role("arn:aws:iam::2:role/b")];

    let jobs = jobs(
        vec![discovery],
        vec![static_job("nat", region_list(2))],
        vec![custom_namespace_job("MyApp", region_list(1))],
    );

    let units = plan_units(&jobs);
    assert_eq!(units.len(), 2 * 3 + 2 + 1);

    let discovery_units: Vec<_> = units
        .iter()
        .filter(|u| matches!(u.job, UnitJob::Discovery(_)))
        .map(|u| (u.role.role_arn.as_str(), u.region.as_str()))
        .collect();
    assert_eq!(
        discovery_units,
        vec![
            ("arn:aws:iam::1:role/a", "region-0"),
            ("arn:aws:iam::1:role/a", "region-1"),
            ("arn:aws:iam::1:role/a", "region-2"),
            ("arn:aws:iam::2:role/b", "region-0"),
            ("arn:aws:iam::2:role/b", "region-1"),
            ("arn:aws:iam::2:role/b", "region-2"),
        ]
    );

    assert_eq!(
        units.last().unwrap().to_string(),
        "custom_namespace MyApp region=region-0 role=<default credentials>"
    );
}
