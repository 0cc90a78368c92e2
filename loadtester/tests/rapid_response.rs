mod common;

use hyper::Method;
use loadtester::scenario::rapid_response::{self, EnrolledUsers, Learner};
use loadtester::scenario::Outcome;
use mock_platforms::MockConfig;

fn learner() -> Learner {
    Learner {
        username: "staff".to_string(),
        course: common::course(),
    }
}

#[tokio::test]
async fn submitting_before_login_sends_nothing() {
    let (mock, base) = common::start().await;
    let mut client = common::client(&base);

    let outcome = rapid_response::submit_answer(&mut client, &learner()).await.unwrap();

    assert_eq!(outcome, Outcome::Interrupted);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn login_enroll_and_submit() {
    let (mock, base) = common::start().await;
    let settings = common::settings(&base);
    let mut client = common::client(&base);
    let enrolled = EnrolledUsers::default();
    let learner = learner();

    rapid_response::login_and_enroll(&mut client, &settings.rapid_response, &learner, &enrolled)
        .await
        .unwrap();
    assert!(rapid_response::client_is_logged_into_edx(&client));
    assert!(enrolled.contains("staff"));
    assert!(mock.is_enrolled("staff", common::COURSE_ID));

    let outcome = rapid_response::submit_answer(&mut client, &learner).await.unwrap();
    assert_eq!(outcome, Outcome::Completed);

    let submissions = mock.submissions();
    assert_eq!(submissions.len(), 1);
    let submission = &submissions[0];
    assert_eq!(submission.course_id, common::COURSE_ID);
    assert_eq!(submission.answers.len(), 1);
    let (field, answer) = &submission.answers[0];
    assert_eq!(field, "input_q1_2_1");
    assert!(answer == "choice_0" || answer == "choice_1");

    let stats = client.statistics();
    assert_eq!(stats.get("Problem Submission").unwrap().failures, 0);
    assert_eq!(stats.get("Course Enrollment (enroll)").unwrap().count, 1);
    assert_eq!(stats.get("Course Enrollment (unenroll)").unwrap().count, 1);
}

#[tokio::test]
async fn enrolls_once_per_run() {
    let (mock, base) = common::start().await;
    let settings = common::settings(&base);
    let enrolled = EnrolledUsers::default();
    let learner = learner();

    // a second virtual user for the same account reuses the enrollment
    for _ in 0..2 {
        let mut client = common::client(&base);
        rapid_response::login_and_enroll(&mut client, &settings.rapid_response, &learner, &enrolled)
            .await
            .unwrap();
    }

    assert_eq!(mock.count_requests(&Method::POST, "/change_enrollment"), 2);
    assert_eq!(
        mock.count_requests(&Method::POST, "/user_api/v1/account/login_session/"),
        2
    );
    assert_eq!(enrolled.len(), 1);
}

#[tokio::test]
async fn mock_keeps_only_the_newest_log_entries() {
    let config = MockConfig {
        log_limit: 2,
        ..MockConfig::default()
    };
    let (mock, base) = common::start_with(config).await;
    let settings = common::settings(&base);
    let mut client = common::client(&base);
    let enrolled = EnrolledUsers::default();
    let learner = learner();

    rapid_response::login_and_enroll(&mut client, &settings.rapid_response, &learner, &enrolled)
        .await
        .unwrap();
    for _ in 0..3 {
        rapid_response::submit_answer(&mut client, &learner).await.unwrap();
    }

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|request| request.path.ends_with("/problem_check")));
    assert_eq!(mock.submissions().len(), 2);
    assert!(mock.is_enrolled("staff", common::COURSE_ID));
}
