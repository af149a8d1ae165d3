//! GET /whoami - reconcile the asserted identity with the client session.

use super::error::ApiError;
use super::AppState;
use crate::identity::{
    IdentityStore, Metadata, RequestContext, SessionState, StoreError, UiAffordance, UserId,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Session decision as returned to the client.
#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub request_id: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub session_id: String,
    pub priority: i32,
    pub force_use: bool,
    /// The identity was created by this request
    pub created: bool,
    pub profile_written: bool,
    pub suppressed: BTreeSet<UiAffordance>,
    pub metadata: Metadata,
}

/// Build the request context from trusted headers and the session cookie.
pub fn request_context(state: &AppState, headers: &HeaderMap) -> RequestContext {
    let mut request = RequestContext::new();
    for (header_name, var) in &state.config.server.trusted_headers {
        if let Some(value) = headers.get(header_name).and_then(|v| v.to_str().ok()) {
            request = request.with_var(var, value);
        }
    }
    if let Some(session_id) = session_cookie(headers, &state.config.server.session_cookie) {
        request = request.with_session_id(session_id);
    }
    request
}

/// Value of the cookie called `name`, if the client sent it.
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub async fn handle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let request = request_context(&state, &headers);

    let Some(session) = state.provider.resolve(&request)? else {
        return Err(ApiError::unauthenticated(
            "No remote identity could be bound to this request",
        ));
    };

    if session.is_new_identity() && !state.directory.capabilities()?.permits_creation() {
        tracing::info!(
            request_id = %request.request_id(),
            user = session.identity.name().unwrap_or_default(),
            "Account creation is closed, refusing new identity"
        );
        return Err(ApiError::creation_forbidden(
            "The asserted identity does not exist and account creation is closed",
        ));
    }

    let mut selection = state
        .provider
        .on_selected(&session, &request, &session.metadata)?;

    let created = create_if_new(&state, &session)?;
    if created {
        if let Some(name) = session.identity.name() {
            selection.profile_written |= state.provider.identity_created(name)?;
        }
    }

    state.sessions.persist(&session);

    let user = session.identity.name().unwrap_or_default().to_string();
    let body = WhoamiResponse {
        request_id: request.request_id().to_string(),
        user_id: state.directory.user_id(&user)?,
        user,
        session_id: session.session_id.clone(),
        priority: session.priority,
        force_use: session.force_use,
        created,
        profile_written: selection.profile_written,
        suppressed: selection.suppressed,
        metadata: session.metadata.clone(),
    };

    let mut response = Json(body).into_response();
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        state.config.server.session_cookie, session.session_id
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::internal(&format!("Invalid session cookie: {}", e)))?;
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

/// Create the session identity if the decision said it is new.
///
/// A concurrent request may have created it first; that counts as existing.
fn create_if_new(state: &AppState, session: &SessionState) -> Result<bool, ApiError> {
    if !session.is_new_identity() {
        return Ok(false);
    }
    let Some(name) = session.identity.name() else {
        return Ok(false);
    };
    match state.directory.create_user(name) {
        Ok(_) => Ok(true),
        Err(StoreError::AlreadyExists(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
