//! Session middleware and extractor.
//!
//! [`session_layer`] runs every request through the
//! [`SessionCoordinator`](gs_session::SessionCoordinator): the identifier is
//! read from the session cookie, the resolved [`SessionHandle`] is placed in
//! the request extensions, and the session is reconciled with the store once
//! the inner service has produced its response. Handlers obtain the handle
//! with the [`Session`] extractor.

use std::convert::Infallible;
use std::ops::Deref;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use gs_session::{Reconciliation, SessionHandle};

use crate::state::AppState;

/// Extractor for the current request's session.
///
/// Requires [`session_layer`] on the route; otherwise the request is rejected
/// with `500`.
#[derive(Debug, Clone)]
pub struct Session(pub SessionHandle);

impl Deref for Session {
    type Target = SessionHandle;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .map(Session)
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "session layer is not installed",
            ))
    }
}

/// Middleware binding each request to its session.
///
/// Responds with `500` if the session could not be resolved or written back.
pub async fn session_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.config.cookie_name.as_str();
    let requested = session_cookie(request.headers(), cookie_name);

    let result = state
        .sessions
        .handle(requested.as_deref(), |session| async move {
            let mut request = request;
            request.extensions_mut().insert(session);
            Ok::<_, Infallible>(next.run(request).await)
        })
        .await;

    match result {
        Ok(outcome) => {
            let mut response = outcome.value;
            let cookie = if outcome.reconciliation == Reconciliation::Removed {
                requested
                    .is_some()
                    .then(|| format!("{cookie_name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"))
            } else if outcome.is_new {
                Some(format!(
                    "{cookie_name}={}; Path=/; HttpOnly; SameSite=Lax",
                    outcome.session_id
                ))
            } else {
                None
            };

            if let Some(cookie) = cookie {
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        response.headers_mut().append(SET_COOKIE, value);
                    }
                    Err(err) => tracing::warn!(error = %err, "invalid session cookie header"),
                }
            }
            response
        }
        Err(err) => {
            tracing::error!(error = %err, "session handling failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "session unavailable").into_response()
        }
    }
}

/// Returns the first non-empty value of the `name` cookie.
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.trim_matches('"').to_string())
}
