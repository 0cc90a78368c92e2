//! Rapid response: learners log into the LMS, enroll once per run and keep
//! answering multiple-choice problems.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use goose::prelude::*;
use parking_lot::Mutex;
use platform_wire::edx::{
    answer_field, problem_check_path, CourseData, EnrollmentAction, EnrollmentForm, LoginForm,
    CHANGE_ENROLLMENT_PATH, LOGGED_IN_COOKIE, LOGIN_PAGE_PATH, LOGIN_SESSION_PATH,
};
use platform_wire::{CSRF_COOKIE, CSRF_HEADER};
use rand::seq::SliceRandom;

use super::{bound_transaction, Outcome};
use crate::harness::{self, Certificates, GooseSession};
use crate::session::{NamedRequest, Session};
use crate::settings::{RapidResponseSettings, Settings};

pub const SCENARIO_NAME: &str = "RapidResponse";
pub const CERTIFICATES: Certificates = Certificates::Verify;

/// Usernames enrolled so far in this run, shared by all virtual users.
#[derive(Debug, Clone, Default)]
pub struct EnrolledUsers {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl EnrolledUsers {
    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.inner.lock().contains(username)
    }

    pub fn insert(&self, username: &str) {
        self.inner.lock().insert(username.to_string());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RapidResponseContext {
    pub settings: Arc<Settings>,
    pub enrolled: EnrolledUsers,
}

#[derive(Debug, Clone)]
pub struct Learner {
    pub username: String,
    pub course: CourseData,
}

impl Learner {
    #[must_use]
    pub fn random(usernames: &[String], courses: &[CourseData]) -> Option<Self> {
        let mut rng = rand::thread_rng();
        let username = usernames.choose(&mut rng)?.clone();
        let course = courses.choose(&mut rng)?.clone();
        Some(Self { username, course })
    }

    /// A random block of the course and one of its answers.
    #[must_use]
    pub fn pick_answer(&self) -> Option<(&str, &str, &str)> {
        let mut rng = rand::thread_rng();
        let block = self.course.blocks.choose(&mut rng)?;
        let answer = block.answer_ids.choose(&mut rng)?;
        Some((&block.id, &block.choicegroup_id, answer))
    }
}

pub fn client_is_logged_into_edx<S: Session>(session: &S) -> bool {
    session.base_cookie(LOGGED_IN_COOKIE).as_deref() == Some("true")
}

pub async fn login<S: Session>(session: &mut S, username: &str, password: &str) -> Result<()> {
    session
        .send(NamedRequest::get(LOGIN_PAGE_PATH).name("Initial login request"))
        .await?;
    let csrf_token = session.base_cookie(CSRF_COOKIE);
    let request = NamedRequest::post(LOGIN_SESSION_PATH)
        .name("Actual login")
        .header("Referer", LOGIN_PAGE_PATH)
        .header_opt(CSRF_HEADER, csrf_token)
        .form(&LoginForm::new(username, password))?;
    session.send(request).await?;
    Ok(())
}

/// Unenrolls first since the LMS errors when an enrolled learner enrolls again.
pub async fn enroll<S: Session>(
    session: &mut S,
    learner: &Learner,
    enrolled: &EnrolledUsers,
) -> Result<()> {
    for action in [EnrollmentAction::Unenroll, EnrollmentAction::Enroll] {
        let request = NamedRequest::post(CHANGE_ENROLLMENT_PATH)
            .name(format!("Course Enrollment ({})", action.as_str()))
            .header_opt(CSRF_HEADER, session.base_cookie(CSRF_COOKIE))
            .form(&EnrollmentForm {
                course_id: learner.course.course_id.clone(),
                enrollment_action: action,
            })?;
        session.send(request).await?;
    }
    enrolled.insert(&learner.username);
    Ok(())
}

pub async fn login_and_enroll<S: Session>(
    session: &mut S,
    settings: &RapidResponseSettings,
    learner: &Learner,
    enrolled: &EnrolledUsers,
) -> Result<()> {
    if !client_is_logged_into_edx(session) {
        login(session, &learner.username, &settings.password).await?;
    }
    if !enrolled.contains(&learner.username) {
        enroll(session, learner, enrolled).await?;
    }
    Ok(())
}

pub async fn submit_answer<S: Session>(session: &mut S, learner: &Learner) -> Result<Outcome> {
    if !client_is_logged_into_edx(session) {
        return Ok(Outcome::Interrupted);
    }
    let (block_id, choicegroup_id, answer_id) = learner
        .pick_answer()
        .with_context(|| format!("Course {} has nothing to answer", learner.course.course_id))?;
    let request = NamedRequest::post(problem_check_path(&learner.course.course_id, block_id))
        .name("Problem Submission")
        .header_opt(CSRF_HEADER, session.base_cookie(CSRF_COOKIE))
        .form(&[(answer_field(choicegroup_id), answer_id)])?;
    session.send(request).await?;
    Ok(Outcome::Completed)
}

async fn on_start(ctx: &RapidResponseContext, user: &mut GooseUser) -> TransactionResult {
    let learner = Learner::random(
        &ctx.settings.usernames_in_edx,
        &ctx.settings.rapid_response.course_data,
    );
    match learner {
        Some(learner) => harness::start_virtual_user(user, CERTIFICATES, learner).await,
        None => harness::finish("on_start", Err(anyhow::anyhow!("no learner or course configured"))),
    }
}

async fn login_and_enroll_task(ctx: &RapidResponseContext, user: &mut GooseUser) -> TransactionResult {
    let Some((jar, learner)) = harness::checkout::<Learner>(user) else {
        return harness::finish("login_and_enroll", Err(anyhow::anyhow!("virtual user not started")));
    };
    let mut session = GooseSession::new(user, jar);
    let result = login_and_enroll(
        &mut session,
        &ctx.settings.rapid_response,
        &learner,
        &ctx.enrolled,
    )
    .await;
    harness::finish("login_and_enroll", result)
}

async fn submit_answer_task(_ctx: &RapidResponseContext, user: &mut GooseUser) -> TransactionResult {
    let Some((jar, learner)) = harness::checkout::<Learner>(user) else {
        return harness::finish("submit_answer", Err(anyhow::anyhow!("virtual user not started")));
    };
    let mut session = GooseSession::new(user, jar);
    let result = submit_answer(&mut session, &learner).await.map(|outcome| {
        if outcome == Outcome::Interrupted {
            tracing::trace!(username = %learner.username, "not logged in yet, skipping submission");
        }
    });
    harness::finish("submit_answer", result)
}

pub fn scenario(settings: &Arc<Settings>) -> Result<Scenario, GooseError> {
    let ctx = Arc::new(RapidResponseContext {
        settings: Arc::clone(settings),
        enrolled: EnrolledUsers::default(),
    });
    let rapid = &settings.rapid_response;
    Ok(scenario!(SCENARIO_NAME)
        .set_host(rapid.lms_base_url.as_str())
        .set_wait_time(
            Duration::from_millis(rapid.task_min_wait_ms),
            Duration::from_millis(rapid.task_max_wait_ms),
        )?
        .register_transaction(bound_transaction!(ctx, on_start).set_name("on_start").set_on_start())
        .register_transaction(
            bound_transaction!(ctx, login_and_enroll_task).set_name("login_and_enroll"),
        )
        .register_transaction(
            bound_transaction!(ctx, submit_answer_task)
                .set_name("submit_answer")
                .set_weight(5)?,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_wire::edx::ProblemBlock;

    #[test]
    fn enrolled_users_are_shared_between_clones() {
        let enrolled = EnrolledUsers::default();
        let other = enrolled.clone();
        assert!(other.is_empty());
        enrolled.insert("staff");
        assert!(other.contains("staff"));
        assert!(!other.contains("honor"));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn picked_answer_belongs_to_its_block() {
        let learner = Learner {
            username: "staff".to_string(),
            course: CourseData {
                course_id: "course-v1:MITx+RR+1".to_string(),
                blocks: vec![
                    ProblemBlock {
                        id: "b1".to_string(),
                        choicegroup_id: "c1".to_string(),
                        answer_ids: vec!["choice_0".to_string(), "choice_1".to_string()],
                    },
                    ProblemBlock {
                        id: "b2".to_string(),
                        choicegroup_id: "c2".to_string(),
                        answer_ids: vec!["choice_2".to_string()],
                    },
                ],
            },
        };
        for _ in 0..20 {
            let (block, group, answer) = learner.pick_answer().unwrap();
            match block {
                "b1" => {
                    assert_eq!(group, "c1");
                    assert!(answer == "choice_0" || answer == "choice_1");
                }
                "b2" => assert_eq!((group, answer), ("c2", "choice_2")),
                other => panic!("unexpected block {other}"),
            }
        }
    }

    #[test]
    fn random_learner_needs_a_course() {
        assert!(Learner::random(&["staff".to_string()], &[]).is_none());
    }
}
