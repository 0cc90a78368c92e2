use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use platform_wire::edx::{
    account_username, EnrollmentAction, EnrollmentForm, LoginForm, CHANGE_ENROLLMENT_PATH,
    LOGGED_IN_COOKIE, LOGIN_PAGE_PATH, LOGIN_SESSION_PATH, LOGOUT_PATH,
};
use platform_wire::micromasters::{
    EnrollProgramRequest, COURSE_PRICES_PATH, DASHBOARD_PATH, EDX_LOGIN_PATH,
    ENROLLED_PROGRAMS_PATH, PROFILE_PAGE_PATH,
};
use platform_wire::CSRF_COOKIE;
use serde_json::{json, Map, Value};

use crate::{
    clear_cookie, cookie, csrf_ok, session_user, set_cookie, status, MockPlatforms,
    ProblemSubmission, SESSION_COOKIE,
};

const PAGE: &str = "<!DOCTYPE html><html><body>mock platform</body></html>";
const DASHBOARD_PAGE_PATH: &str = "/dashboard/";
/// Keys the profile API computes itself.
const READ_ONLY_PROFILE_KEYS: &[&str] = &["email_optin", "image"];

pub(crate) fn routes() -> Router<MockPlatforms> {
    Router::new()
        .route("/", get(page))
        .route(LOGIN_PAGE_PATH, get(login_page))
        .route(LOGIN_SESSION_PATH, post(login_session))
        .route(LOGOUT_PATH, get(logout))
        .route(CHANGE_ENROLLMENT_PATH, post(change_enrollment))
        .route(
            "/courses/:course_id/xblock/:block_id/handler/xmodule_handler/problem_check",
            post(problem_check),
        )
        .route(EDX_LOGIN_PATH, get(edxorg_login))
        .route(DASHBOARD_PAGE_PATH, get(page))
        .route(PROFILE_PAGE_PATH, get(page))
        .route("/api/v0/profiles/:username/", get(get_profile).patch(patch_profile))
        .route(DASHBOARD_PATH, get(empty_list))
        .route(COURSE_PRICES_PATH, get(empty_list))
        .route(ENROLLED_PROGRAMS_PATH, get(list_programs).post(enroll_program))
}

#[inline]
async fn page() -> Html<&'static str> {
    Html(PAGE)
}

/// Keeps the client's token, or hands out a fresh one.
fn csrf_token(state: &MockPlatforms, headers: &HeaderMap) -> String {
    match cookie(headers, CSRF_COOKIE) {
        Some(token) => token.to_string(),
        None => format!("csrf{}", state.lock().next_id()),
    }
}

async fn login_page(State(state): State<MockPlatforms>, headers: HeaderMap) -> Response {
    let token = csrf_token(&state, &headers);
    (
        AppendHeaders([(SET_COOKIE, set_cookie(CSRF_COOKIE, &token))]),
        Html(PAGE),
    )
        .into_response()
}

async fn login_session(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    if !csrf_ok(&headers) {
        return status(StatusCode::FORBIDDEN);
    }
    let Some(username) = account_username(&form.email) else {
        return status(StatusCode::BAD_REQUEST);
    };
    if !state.config.passwords.contains(&form.password) {
        return status(StatusCode::FORBIDDEN);
    }
    (
        AppendHeaders([
            (SET_COOKIE, set_cookie(LOGGED_IN_COOKIE, "true")),
            (SET_COOKIE, set_cookie(SESSION_COOKIE, username)),
        ]),
        Json(json!({"success": true})),
    )
        .into_response()
}

async fn logout() -> Response {
    (
        AppendHeaders([
            (SET_COOKIE, clear_cookie(LOGGED_IN_COOKIE)),
            (SET_COOKIE, clear_cookie(SESSION_COOKIE)),
        ]),
        Redirect::to("/"),
    )
        .into_response()
}

async fn change_enrollment(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Form(form): Form<EnrollmentForm>,
) -> Response {
    let Some(username) = session_user(&headers) else {
        return status(StatusCode::UNAUTHORIZED);
    };
    if !csrf_ok(&headers) {
        return status(StatusCode::FORBIDDEN);
    }
    let key = (username, form.course_id);
    let mut platforms = state.lock();
    let changed = match form.enrollment_action {
        EnrollmentAction::Enroll => platforms.enrollments.insert(key),
        EnrollmentAction::Unenroll => platforms.enrollments.remove(&key),
    };
    // the LMS refuses to enroll twice, unenrolling a stranger is fine
    if !changed && form.enrollment_action == EnrollmentAction::Enroll {
        return status(StatusCode::BAD_REQUEST);
    }
    status(StatusCode::OK)
}

async fn problem_check(
    State(state): State<MockPlatforms>,
    Path((course_id, block_id)): Path<(String, String)>,
    headers: HeaderMap,
    Form(answers): Form<Vec<(String, String)>>,
) -> Response {
    let Some(username) = session_user(&headers) else {
        return status(StatusCode::UNAUTHORIZED);
    };
    if !csrf_ok(&headers) {
        return status(StatusCode::FORBIDDEN);
    }
    let mut platforms = state.lock();
    if !platforms
        .enrollments
        .contains(&(username.clone(), course_id.clone()))
    {
        return status(StatusCode::FORBIDDEN);
    }
    platforms.submissions.push(ProblemSubmission {
        username,
        course_id,
        block_id,
        answers,
    });
    Json(json!({"success": "correct"})).into_response()
}

fn default_profile(username: &str) -> Map<String, Value> {
    let profile = json!({
        "username": username,
        "first_name": "",
        "last_name": "",
        "filled_out": false,
        "agreed_to_terms_of_service": false,
        "email_optin": false,
        "image": null,
        "education": [],
        "work_history": [],
    });
    match profile {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Logs into MicroMasters with the edX session and lands on the dashboard.
async fn edxorg_login(State(state): State<MockPlatforms>, headers: HeaderMap) -> Response {
    let Some(username) = session_user(&headers) else {
        return Redirect::to(LOGIN_PAGE_PATH).into_response();
    };
    state
        .lock()
        .profiles
        .entry(username.clone())
        .or_insert_with(|| default_profile(&username));
    let token = csrf_token(&state, &headers);
    (
        AppendHeaders([(SET_COOKIE, set_cookie(CSRF_COOKIE, &token))]),
        Redirect::to(DASHBOARD_PAGE_PATH),
    )
        .into_response()
}

async fn get_profile(
    State(state): State<MockPlatforms>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Response {
    if session_user(&headers).is_none() {
        return status(StatusCode::UNAUTHORIZED);
    }
    match state.lock().profiles.get(&username) {
        Some(profile) => Json(profile.clone()).into_response(),
        None => status(StatusCode::NOT_FOUND),
    }
}

async fn patch_profile(
    State(state): State<MockPlatforms>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(changes): Json<Map<String, Value>>,
) -> Response {
    if session_user(&headers).as_deref() != Some(username.as_str()) {
        return status(StatusCode::FORBIDDEN);
    }
    if !csrf_ok(&headers) {
        return status(StatusCode::FORBIDDEN);
    }
    if let Some(key) = READ_ONLY_PROFILE_KEYS
        .iter()
        .find(|key| changes.contains_key(**key))
    {
        return (StatusCode::BAD_REQUEST, format!("{key} is read only")).into_response();
    }
    let mut platforms = state.lock();
    let Some(profile) = platforms.profiles.get_mut(&username) else {
        return status(StatusCode::NOT_FOUND);
    };
    profile.extend(changes);
    Json(profile.clone()).into_response()
}

async fn empty_list(headers: HeaderMap) -> Response {
    if session_user(&headers).is_none() {
        return status(StatusCode::UNAUTHORIZED);
    }
    Json(json!([])).into_response()
}

async fn list_programs(State(state): State<MockPlatforms>, headers: HeaderMap) -> Response {
    let Some(username) = session_user(&headers) else {
        return status(StatusCode::UNAUTHORIZED);
    };
    let programs: Vec<Value> = state
        .lock()
        .program_enrollments
        .iter()
        .filter(|(user, _)| *user == username)
        .map(|(_, program_id)| json!({"id": program_id}))
        .collect();
    Json(programs).into_response()
}

async fn enroll_program(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Json(request): Json<EnrollProgramRequest>,
) -> Response {
    let Some(username) = session_user(&headers) else {
        return status(StatusCode::UNAUTHORIZED);
    };
    if !csrf_ok(&headers) {
        return status(StatusCode::FORBIDDEN);
    }
    state
        .lock()
        .program_enrollments
        .push((username, request.program_id));
    (StatusCode::CREATED, Json(json!({"id": request.program_id}))).into_response()
}
