mod common;

use std::sync::Arc;

use goose::config::GooseConfiguration;
use goose::metrics::GooseMetrics;
use goose::prelude::*;
use hyper::Method;
use loadtester::harness::Certificates;
use loadtester::scenario::{self, channels, discussion_users, micromasters, rapid_response};
use loadtester::settings::Settings;
use serde_json::Value;

/// One virtual user running the scenario `iterations` times.
async fn run(scenario: Scenario, iterations: usize) -> GooseMetrics {
    GooseAttack::initialize_with_config(GooseConfiguration::default())
        .unwrap()
        .register_scenario(scenario)
        .set_default(GooseDefault::Users, 1)
        .unwrap()
        .set_default(GooseDefault::HatchRate, "1")
        .unwrap()
        .set_default(GooseDefault::Iterations, iterations)
        .unwrap()
        .set_default(GooseDefault::Quiet, 1)
        .unwrap()
        .set_default(GooseDefault::NoPrintMetrics, true)
        .unwrap()
        .set_default(GooseDefault::NoTelnet, true)
        .unwrap()
        .set_default(GooseDefault::NoWebSocket, true)
        .unwrap()
        .execute()
        .await
        .unwrap()
}

fn request_count(metrics: &GooseMetrics, key: &str) -> usize {
    metrics
        .requests
        .get(key)
        .map(|request| request.success_count + request.fail_count)
        .unwrap_or_else(|| panic!("no requests named {key}"))
}

fn request_failures(metrics: &GooseMetrics, key: &str) -> usize {
    metrics.requests.get(key).map_or(0, |request| request.fail_count)
}

fn transaction_runs(metrics: &GooseMetrics, name: &str) -> usize {
    metrics
        .transactions
        .iter()
        .flatten()
        .filter(|transaction| transaction.transaction_name == name)
        .map(|transaction| transaction.success_count + transaction.fail_count)
        .sum()
}

#[tokio::test(flavor = "multi_thread")]
async fn every_scenario_is_registered() {
    let (_mock, base) = common::start().await;
    let settings = Arc::new(common::settings(&base));

    let names: Vec<String> = scenario::all(&settings)
        .unwrap()
        .iter()
        .map(|scenario| scenario.name.clone())
        .collect();

    assert_eq!(
        names,
        vec![
            micromasters::SCENARIO_NAME,
            discussion_users::SCENARIO_NAME,
            rapid_response::SCENARIO_NAME,
            channels::SCENARIO_NAME,
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn scenarios_without_data_are_skipped() {
    let (_mock, base) = common::start().await;
    let mut settings: Settings = common::settings(&base);
    settings.rapid_response.course_data.clear();
    settings.open_discussions.channel_names.clear();

    let scenarios = scenario::all(&Arc::new(settings)).unwrap();

    assert_eq!(scenarios.len(), 2);
}

#[test]
fn only_the_channel_backend_skips_certificate_checks() {
    assert_eq!(micromasters::CERTIFICATES, Certificates::Verify);
    assert_eq!(rapid_response::CERTIFICATES, Certificates::Verify);
    assert_eq!(discussion_users::CERTIFICATES, Certificates::Verify);
    assert_eq!(channels::CERTIFICATES, Certificates::AcceptInvalid);
}

#[tokio::test(flavor = "multi_thread")]
async fn micromasters_fills_out_the_profile() {
    let (mock, base) = common::start().await;
    let settings = Arc::new(common::settings(&base));

    let metrics = run(micromasters::scenario(&settings).unwrap(), 1).await;

    let profile = mock.profile("staff").unwrap();
    assert_eq!(profile["filled_out"], Value::Bool(true));
    assert_eq!(mock.program_enrollments(), vec![("staff".to_string(), 1)]);
    assert!(request_count(&metrics, "PATCH /api/v0/profiles/[username]/") > 0);
    assert_eq!(request_failures(&metrics, "PATCH /api/v0/profiles/[username]/"), 0);
    assert_eq!(transaction_runs(&metrics, "login_and_profile"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn rapid_response_enrolls_then_submits() {
    let (mock, base) = common::start().await;
    let settings = Arc::new(common::settings(&base));

    let metrics = run(rapid_response::scenario(&settings).unwrap(), 2).await;

    assert!(mock.is_enrolled("staff", common::COURSE_ID));
    // the second pass runs every submission after the first pass logged in
    assert!(mock.submissions().len() >= 5);
    assert_eq!(
        mock.count_requests(&Method::POST, "/user_api/v1/account/login_session/"),
        1
    );
    assert_eq!(transaction_runs(&metrics, "login_and_enroll"), 2);
    assert_eq!(transaction_runs(&metrics, "submit_answer"), 10);
    assert_eq!(
        request_count(&metrics, "POST Problem Submission"),
        mock.submissions().len()
    );
    assert_eq!(request_failures(&metrics, "POST Problem Submission"), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn discussion_users_are_created_and_renamed() {
    let (mock, base) = common::start().await;
    let settings = Arc::new(common::settings(&base));

    let metrics = run(discussion_users::scenario(&settings).unwrap(), 2).await;

    // the user limit is two
    assert_eq!(mock.count_requests(&Method::POST, "/api/v0/users/"), 2);
    assert!(mock.count_requests(&Method::PATCH, "/api/v0/users/") >= 1);
    assert_eq!(request_failures(&metrics, "POST /api/v0/users/"), 0);
    assert_eq!(request_failures(&metrics, "PATCH /users/[username]/"), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn channel_readers_browse_and_discuss() {
    let (mock, base) = common::start().await;
    mock.seed_channel("load_test", "Load Test", "staff");
    let settings = Arc::new(common::settings(&base));

    let metrics = run(channels::scenario(&settings).unwrap(), 1).await;

    assert_eq!(mock.count_requests(&Method::POST, "/api/v1/access_token"), 1);
    assert_eq!(mock.count_requests(&Method::POST, "/api/submit"), 1);
    assert_eq!(mock.count_requests(&Method::POST, "/api/comment"), 2);
    assert_eq!(transaction_runs(&metrics, "browse"), 3);
    assert_eq!(transaction_runs(&metrics, "discuss"), 1);
    let failures: usize = metrics.requests.values().map(|request| request.fail_count).sum();
    assert_eq!(failures, 0);
}
