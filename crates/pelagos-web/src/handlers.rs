use std::fs;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Local};

use pelagos_core::config::{normalize_update_days, parse_update_time};
use pelagos_core::{PelagosError, UpdateScheduler};

use crate::WebState;
use crate::auth;
use crate::dto::{
    ChatRequest, ChatResponse, DatabaseStatusResponse, LoginRequest, MessageResponse,
    SchedulerActionRequest, SchedulerActionResponse, SchedulerConfigRequest, SessionUser,
    UpdateFileEntry, UploadResponse,
};
use crate::error::error_response;
use crate::pages;

pub async fn index() -> Response {
    Html(pages::INDEX_HTML).into_response()
}

pub async fn login_page() -> Response {
    Html(pages::LOGIN_HTML).into_response()
}

/// The dashboard is a browser page, so anonymous visitors are sent to the
/// login form instead of getting a JSON 401.
pub async fn admin_page(State(state): State<WebState>, headers: HeaderMap) -> Response {
    match auth::authenticate(&state, &headers) {
        Ok(user) if user.is_admin => Html(pages::ADMIN_HTML).into_response(),
        Ok(_) => error_response(
            PelagosError::Forbidden("administrator access required".to_string()),
            "pages.admin",
            None,
        ),
        Err(_) => Redirect::to("/login").into_response(),
    }
}

pub async fn app_css() -> Response {
    static_asset("text/css; charset=utf-8", pages::APP_CSS)
}

pub async fn chat_js() -> Response {
    static_asset("text/javascript; charset=utf-8", pages::CHAT_JS)
}

pub async fn login_js() -> Response {
    static_asset("text/javascript; charset=utf-8", pages::LOGIN_JS)
}

pub async fn admin_js() -> Response {
    static_asset("text/javascript; charset=utf-8", pages::ADMIN_JS)
}

fn static_asset(content_type: &'static str, body: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        body,
    )
        .into_response()
}

pub async fn login(State(state): State<WebState>, Json(request): Json<LoginRequest>) -> Response {
    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return error_response(
            PelagosError::Validation("username and password are required".to_string()),
            "auth.login",
            None,
        );
    }
    let user = match state.store.verify_login(username, &request.password) {
        Ok(Some(user)) => user,
        Ok(None) => {
            return error_response(
                PelagosError::Unauthorized("invalid username or password".to_string()),
                "auth.login",
                None,
            );
        }
        Err(err) => return error_response(err, "auth.login", None),
    };
    let session = match state
        .store
        .create_auth_session(user.id, state.session_ttl_secs)
    {
        Ok(session) => session,
        Err(err) => return error_response(err, "auth.login", None),
    };
    let cookie = match auth::session_cookie(&session.token, state.session_ttl_secs) {
        Ok(cookie) => cookie,
        Err(err) => return error_response(err, "auth.login", None),
    };
    let mut response = (StatusCode::OK, Json(SessionUser::from(user))).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    response
}

pub async fn logout(State(state): State<WebState>, headers: HeaderMap) -> Response {
    if let Err(err) = auth::authenticate(&state, &headers) {
        return error_response(err, "auth.logout", None);
    }
    if let Some(token) = auth::session_token(&headers) {
        if let Err(err) = state.store.delete_auth_session(&token) {
            return error_response(err, "auth.logout", None);
        }
    }
    let mut response = (
        StatusCode::OK,
        Json(MessageResponse {
            message: "logged out".to_string(),
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, auth::clear_session_cookie());
    response
}

pub async fn chat(State(state): State<WebState>, Json(request): Json<ChatRequest>) -> Response {
    let hint = request.agent_hint();
    match state
        .agent
        .answer(&request.query, request.session_id.as_deref(), hint)
    {
        Ok(answer) => (
            StatusCode::OK,
            Json(ChatResponse {
                response: answer.text,
                response_html: answer.html,
                session_id: answer.session_id,
                agent_type: answer.agent_kind.as_str(),
            }),
        )
            .into_response(),
        Err(err) => error_response(err, "chat.answer", None),
    }
}

pub async fn get_ports(State(state): State<WebState>) -> Response {
    match state.store.list_ports() {
        Ok(ports) => (StatusCode::OK, Json(ports)).into_response(),
        Err(err) => error_response(err, "dataset.ports", None),
    }
}

pub async fn database_status(State(state): State<WebState>) -> Response {
    match build_database_status(&state) {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => error_response(err, "admin.database_status", None),
    }
}

fn build_database_status(state: &WebState) -> pelagos_core::Result<DatabaseStatusResponse> {
    Ok(DatabaseStatusResponse {
        counts: state.store.counts()?,
        last_import: state.store.last_import_run()?,
        active_chat_sessions: state.agent.active_sessions()?,
        scheduler_running: state.scheduler()?.is_running(),
    })
}

pub async fn update_data(State(state): State<WebState>) -> Response {
    let outcome = state
        .scheduler()
        .and_then(|scheduler| scheduler.run_now());
    match outcome {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err, "admin.update_data", None),
    }
}

pub async fn list_update_files(State(state): State<WebState>) -> Response {
    match collect_update_files(&state) {
        Ok(files) => (StatusCode::OK, Json(files)).into_response(),
        Err(err) => error_response(err, "admin.files", None),
    }
}

fn collect_update_files(state: &WebState) -> pelagos_core::Result<Vec<UpdateFileEntry>> {
    let dir = state.update_dir()?;
    let mut files = Vec::new();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;
        if !metadata.is_file() || !has_json_extension(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let modified = metadata
            .modified()
            .map(format_timestamp)
            .unwrap_or_default();
        files.push(UpdateFileEntry {
            name: name.to_string(),
            size_bytes: metadata.len(),
            modified,
        });
    }
    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}

pub async fn upload_update_file(
    State(state): State<WebState>,
    mut multipart: Multipart,
) -> Response {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => {}
            Ok(None) => {
                return error_response(
                    PelagosError::Validation("multipart field 'file' is required".to_string()),
                    "admin.upload",
                    None,
                );
            }
            Err(err) => {
                return error_response(
                    PelagosError::Validation(format!("malformed multipart request: {err}")),
                    "admin.upload",
                    None,
                );
            }
        }
    };
    let Some(original_name) = field.file_name().map(str::to_string) else {
        return error_response(
            PelagosError::Validation("upload needs a file name".to_string()),
            "admin.upload",
            None,
        );
    };
    let bytes = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            return error_response(
                PelagosError::Validation(format!("could not read upload: {err}")),
                "admin.upload",
                None,
            );
        }
    };
    match store_upload(&state, &original_name, &bytes) {
        Ok(stored) => (StatusCode::OK, Json(stored)).into_response(),
        Err(err) => error_response(err, "admin.upload", Some(original_name)),
    }
}

fn store_upload(
    state: &WebState,
    original_name: &str,
    bytes: &[u8],
) -> pelagos_core::Result<UploadResponse> {
    let safe_name = sanitize_file_name(original_name)?;
    if !safe_name.to_ascii_lowercase().ends_with(".json") {
        return Err(PelagosError::Validation(format!(
            "only .json files are accepted, got '{safe_name}'"
        )));
    }
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|err| PelagosError::InvalidDataset(format!("upload is not valid JSON: {err}")))?;
    let dir = state.update_dir()?;
    fs::create_dir_all(&dir)?;
    let stored_as = format!("{}_{safe_name}", Local::now().format("%Y%m%d%H%M%S"));
    fs::write(dir.join(&stored_as), bytes)?;
    Ok(UploadResponse {
        stored_as,
        size_bytes: bytes.len() as u64,
        routes: route_count(&value),
    })
}

pub async fn delete_update_file(State(state): State<WebState>, Path(name): Path<String>) -> Response {
    match remove_update_file(&state, &name) {
        Ok(removed) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: format!("deleted {removed}"),
            }),
        )
            .into_response(),
        Err(err) => error_response(err, "admin.delete_file", Some(name)),
    }
}

fn remove_update_file(state: &WebState, name: &str) -> pelagos_core::Result<String> {
    let name = checked_update_file(name)?;
    let path = state.update_dir()?.join(&name);
    if !path.is_file() {
        return Err(PelagosError::NotFound(format!("update file {name}")));
    }
    fs::remove_file(&path)?;
    Ok(name)
}

pub async fn scheduler_status(State(state): State<WebState>) -> Response {
    let status = state.scheduler().and_then(|scheduler| scheduler.status());
    match status {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => error_response(err, "admin.scheduler_status", None),
    }
}

pub async fn scheduler_control(
    State(state): State<WebState>,
    Json(request): Json<SchedulerActionRequest>,
) -> Response {
    match run_scheduler_action(&state, &request.action) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => error_response(err, "admin.scheduler_control", None),
    }
}

fn run_scheduler_action(
    state: &WebState,
    action: &str,
) -> pelagos_core::Result<SchedulerActionResponse> {
    let scheduler = state.scheduler()?;
    let (changed, outcome) = match action {
        "start" => (scheduler.start()?, None),
        "stop" => (scheduler.stop()?, None),
        "run_now" => (true, Some(scheduler.run_now()?)),
        other => {
            return Err(PelagosError::Validation(format!(
                "unknown scheduler action '{other}' (expected start, stop, or run_now)"
            )));
        }
    };
    Ok(SchedulerActionResponse {
        action: action.to_string(),
        changed,
        status: scheduler.status()?,
        outcome,
    })
}

pub async fn update_scheduler_config(
    State(state): State<WebState>,
    Json(request): Json<SchedulerConfigRequest>,
) -> Response {
    match apply_scheduler_config(&state, request) {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => error_response(err, "admin.scheduler_config", None),
    }
}

/// Applies a config change by rebuilding the scheduler; a running worker is
/// stopped first and started again with the new settings.
fn apply_scheduler_config(
    state: &WebState,
    request: SchedulerConfigRequest,
) -> pelagos_core::Result<pelagos_core::scheduler::SchedulerStatus> {
    let mut scheduler = state.scheduler()?;
    let mut config = scheduler.config().clone();
    if let Some(enabled) = request.enabled {
        config.enabled = enabled;
    }
    if let Some(time) = request.update_time {
        let time = time.trim().to_string();
        if parse_update_time(&time).is_none() {
            return Err(PelagosError::Validation(format!(
                "update time '{time}' is not HH:MM"
            )));
        }
        config.update_time = time;
    }
    if let Some(days) = request.update_days {
        let normalized = normalize_update_days(&days.join(","));
        if normalized.is_empty() {
            return Err(PelagosError::Validation(
                "no recognizable update days given".to_string(),
            ));
        }
        config.update_days = normalized;
    }
    if let Some(historical) = request.historical_enabled {
        config.historical_enabled = historical;
    }

    let was_running = scheduler.is_running();
    if was_running {
        scheduler.stop()?;
    }
    let resume = was_running && config.enabled;
    *scheduler = UpdateScheduler::new(state.store.clone(), config);
    if resume {
        scheduler.start()?;
    }
    scheduler.status()
}

fn format_timestamp(time: std::time::SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn has_json_extension(path: &std::path::Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Keeps only the final path component of a browser-supplied file name and
/// replaces anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(raw: &str) -> pelagos_core::Result<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned
        .trim_matches(|ch: char| matches!(ch, '.' | '_' | '-'))
        .is_empty()
    {
        return Err(PelagosError::Validation(
            "upload needs a usable file name".to_string(),
        ));
    }
    Ok(cleaned)
}

/// Update-file names arrive as route parameters; anything that is not a bare
/// `.json` name is refused before it can touch the filesystem.
fn checked_update_file(name: &str) -> pelagos_core::Result<String> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(PelagosError::PathTraversal(name.to_string()));
    }
    if !name.to_ascii_lowercase().ends_with(".json") {
        return Err(PelagosError::Validation(format!(
            "'{name}' is not a .json update file"
        )));
    }
    Ok(name.to_string())
}

fn route_count(value: &serde_json::Value) -> Option<usize> {
    match value {
        serde_json::Value::Array(routes) => Some(routes.len()),
        serde_json::Value::Object(map) => map
            .get("routes")
            .and_then(serde_json::Value::as_array)
            .map(Vec::len),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{checked_update_file, route_count, sanitize_file_name};

    #[test]
    fn uploaded_names_lose_their_directories() {
        assert_eq!(
            sanitize_file_name("../../etc/evil.json").expect("name"),
            "evil.json"
        );
        assert_eq!(
            sanitize_file_name("C:\\feeds\\july feed.json").expect("name"),
            "july_feed.json"
        );
        assert!(sanitize_file_name("....").is_err());
        assert!(sanitize_file_name("").is_err());
    }

    #[test]
    fn delete_names_must_be_bare_json_files() {
        assert!(checked_update_file("feed.json").is_ok());
        assert!(checked_update_file("a/b.json").is_err());
        assert!(checked_update_file("..\\feed.json").is_err());
        assert!(checked_update_file("feed..json").is_err());
        assert!(checked_update_file("notes.txt").is_err());
    }

    #[test]
    fn route_counts_cover_both_feed_shapes() {
        let array = serde_json::json!([{"route_id": "R1"}, {"route_id": "R2"}]);
        assert_eq!(route_count(&array), Some(2));
        let wrapped = serde_json::json!({"routes": [{"route_id": "R1"}]});
        assert_eq!(route_count(&wrapped), Some(1));
        let other = serde_json::json!({"note": "hello"});
        assert_eq!(route_count(&other), None);
    }
}
