//! First login to MicroMasters through edX, then a walk through every profile tab.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use goose::prelude::*;
use platform_wire::edx::{LoginForm, LOGIN_PAGE_PATH, LOGIN_SESSION_PATH, LOGOUT_PATH};
use platform_wire::micromasters::{
    profile_path, EnrollProgramRequest, COURSE_PRICES_PATH, DASHBOARD_PATH, EDX_LOGIN_PATH,
    ENROLLED_PROGRAMS_PATH, PROFILE_PAGE_PATH,
};
use platform_wire::{CSRF_COOKIE, CSRF_HEADER};
use rand::seq::SliceRandom;
use serde_json::{Map, Value};

use super::bound_transaction;
use crate::harness::{self, Certificates, GooseSession};
use crate::profile::{self, ProfileDraft};
use crate::session::{NamedRequest, Session};
use crate::settings::{MicromastersSettings, Settings};

pub const SCENARIO_NAME: &str = "MicroMasters";
pub const CERTIFICATES: Certificates = Certificates::Verify;
const PROFILE_NAME: &str = "/api/v0/profiles/[username]/";

/// A learner who already has an edX account.
#[derive(Debug, Clone)]
pub struct Learner {
    pub username: String,
    /// MicroMasters' own anti-forgery token, known once logged in.
    pub csrf_token: Option<String>,
}

impl Learner {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            csrf_token: None,
        }
    }

    #[must_use]
    pub fn random(usernames: &[String]) -> Option<Self> {
        usernames
            .choose(&mut rand::thread_rng())
            .map(|username| Self::new(username.as_str()))
    }

    fn csrf_header(&self, request: NamedRequest) -> NamedRequest {
        request.header_opt(CSRF_HEADER, self.csrf_token.as_deref())
    }
}

pub async fn index_no_login<S: Session>(session: &mut S) -> Result<()> {
    session.send(NamedRequest::get("/")).await?;
    Ok(())
}

/// Logs into edX with the account's form, then into MicroMasters through edX.
pub async fn login<S: Session>(
    session: &mut S,
    settings: &MicromastersSettings,
    learner: &mut Learner,
) -> Result<()> {
    let edx_login = settings.edxorg_base_url.join(LOGIN_PAGE_PATH)?;
    session
        .send(NamedRequest::get(edx_login.as_str()).name("/login[edx login page]"))
        .await?;
    let edx_csrf = session.cookie(&edx_login, CSRF_COOKIE);

    let login_session = settings.edxorg_base_url.join(LOGIN_SESSION_PATH)?;
    let request = NamedRequest::post(login_session.as_str())
        .name("/user_api/v1/account/login_session/[edx login form]")
        .header_opt(CSRF_HEADER, edx_csrf)
        .form(&LoginForm::new(&learner.username, &settings.password))?;
    session.send(request).await?;

    session
        .send(NamedRequest::get(EDX_LOGIN_PATH).name("/login/edxorg/[micromasters]"))
        .await?;
    learner.csrf_token = session.cookie(&settings.base_url, CSRF_COOKIE);
    if learner.csrf_token.is_none() {
        tracing::debug!(username = %learner.username, "no MicroMasters csrf token after login");
    }
    Ok(())
}

pub async fn logout<S: Session>(session: &mut S, settings: &MicromastersSettings) -> Result<()> {
    let edx_logout = settings.edxorg_base_url.join(LOGOUT_PATH)?;
    session
        .send(NamedRequest::get(edx_logout.as_str()).name("/logout[edx]"))
        .await?;
    session
        .send(NamedRequest::get(LOGOUT_PATH).name("/logout[micromasters]"))
        .await?;
    Ok(())
}

async fn patch_profile<S: Session>(
    session: &mut S,
    learner: &Learner,
    draft: &ProfileDraft,
) -> Result<()> {
    let request = learner
        .csrf_header(NamedRequest::patch(profile_path(&learner.username)).name(PROFILE_NAME))
        .json(draft)?;
    session.send(request).await?;
    Ok(())
}

/// Loads the profile tabs, resets the profile, then fills it in tab by tab.
pub async fn profile_tabs<S: Session>(
    session: &mut S,
    settings: &MicromastersSettings,
    learner: &Learner,
) -> Result<()> {
    session.send(NamedRequest::get(PROFILE_PAGE_PATH)).await?;
    let fetched: Map<String, Value> = session
        .send(NamedRequest::get(profile_path(&learner.username)).name(PROFILE_NAME))
        .await?
        .error_for_status()?
        .json()?;
    session.send(NamedRequest::get(DASHBOARD_PATH)).await?;
    session.send(NamedRequest::get(COURSE_PRICES_PATH)).await?;
    session.send(NamedRequest::get(ENROLLED_PROGRAMS_PATH)).await?;

    let mut draft = ProfileDraft::reset(fetched)
        .with_context(|| format!("Unexpected profile for {}", learner.username))?;
    draft.fill_personal_info(&learner.username);

    patch_profile(session, learner, &draft).await?;
    let enroll = learner
        .csrf_header(NamedRequest::post(ENROLLED_PROGRAMS_PATH))
        .json(&EnrollProgramRequest {
            program_id: settings.program_id,
        })?;
    session.send(enroll).await?;
    session.send(NamedRequest::get(DASHBOARD_PATH)).await?;
    session.send(NamedRequest::get(COURSE_PRICES_PATH)).await?;

    draft.add_education(profile::high_school());
    patch_profile(session, learner, &draft).await?;
    draft.add_education(profile::college());
    patch_profile(session, learner, &draft).await?;

    draft.add_work_history(profile::software_engineer());
    patch_profile(session, learner, &draft).await?;

    if !draft.was_filled_out() {
        draft.mark_filled_out();
        patch_profile(session, learner, &draft).await?;
    }
    Ok(())
}

pub async fn login_and_profile<S: Session>(
    session: &mut S,
    settings: &MicromastersSettings,
    learner: &mut Learner,
) -> Result<()> {
    index_no_login(session).await?;
    login(session, settings, learner).await?;
    profile_tabs(session, settings, learner).await?;
    logout(session, settings).await
}

async fn on_start(settings: &Settings, user: &mut GooseUser) -> TransactionResult {
    match Learner::random(&settings.usernames_in_edx) {
        Some(learner) => harness::start_virtual_user(user, CERTIFICATES, learner).await,
        None => harness::finish("on_start", Err(anyhow::anyhow!("empty username pool"))),
    }
}

async fn login_and_profile_task(settings: &Settings, user: &mut GooseUser) -> TransactionResult {
    let Some((jar, mut learner)) = harness::checkout::<Learner>(user) else {
        return harness::finish("login_and_profile", Err(anyhow::anyhow!("virtual user not started")));
    };
    let mut session = GooseSession::new(user, jar);
    let result = login_and_profile(&mut session, &settings.micromasters, &mut learner).await;
    // tokens do not outlive the logout
    learner.csrf_token = None;
    harness::checkin(user, learner);
    harness::finish("login_and_profile", result)
}

pub fn scenario(settings: &Arc<Settings>) -> Result<Scenario, GooseError> {
    Ok(scenario!(SCENARIO_NAME)
        .set_host(settings.micromasters.base_url.as_str())
        .set_wait_time(Duration::from_secs(1), Duration::from_secs(3))?
        .register_transaction(
            bound_transaction!(settings, on_start)
                .set_name("on_start")
                .set_on_start(),
        )
        .register_transaction(
            bound_transaction!(settings, login_and_profile_task).set_name("login_and_profile"),
        ))
}
