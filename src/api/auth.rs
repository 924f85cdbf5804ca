//! Login/logout endpoints and the session cookie

use std::sync::Mutex;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{HeaderMap, header, request::Parts},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use super::reply::{ApiError, reply};
use crate::error::SponosError;

const COOKIE_NAME: &str = "user";

/// Token handed to the browser at login; one remote session at a time
#[derive(Default)]
pub struct SessionToken {
    current: Mutex<Option<String>>,
}

impl SessionToken {
    pub fn issue(&self) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        if let Ok(mut current) = self.current.lock() {
            *current = Some(token.clone());
        }
        token
    }

    pub fn revoke(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }

    pub fn verify(&self, presented: &str) -> bool {
        self.current
            .lock()
            .map(|current| current.as_deref() == Some(presented))
            .unwrap_or(false)
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Extractor that rejects requests without a valid session cookie
pub struct LoggedIn;

#[async_trait]
impl FromRequestParts<AppState> for LoggedIn {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match cookie_value(&parts.headers, COOKIE_NAME) {
            Some(token) if state.token.verify(token) => Ok(LoggedIn),
            _ => {
                tracing::debug!(path = %parts.uri.path(), "Rejected request without a session");
                Err(ApiError::Unauthed)
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthParams {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    callback: Option<String>,
}

pub async fn auth(
    State(state): State<AppState>,
    Path(action): Path<String>,
    Query(params): Query<AuthParams>,
) -> Result<Response, ApiError> {
    match action.as_str() {
        "login" => login(&state, &params).await,
        "logout" => logout(&state).await,
        "unauthed" => Err(ApiError::Unauthed),
        other => Err(ApiError::BadRequest(format!("Action `{other}` not supported"))),
    }
}

async fn login(state: &AppState, params: &AuthParams) -> Result<Response, ApiError> {
    let callback = params.callback.as_deref();
    match state.coordinator.login(&params.username, &params.password).await {
        Ok(user) => {
            let token = state.token.issue();
            tracing::info!(user = %user, "Remote logged in");
            let cookie = format!("{COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax");
            let body = reply(json!({ "message": "ok" }), callback)?;
            Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), body).into_response())
        }
        Err(SponosError::AuthenticationFailure(message)) => reply(json!({ "message": message }), callback),
        Err(e) => Err(e.into()),
    }
}

async fn logout(state: &AppState) -> Result<Response, ApiError> {
    state.coordinator.logout().await?;
    state.token.revoke();
    let cookie = format!("{COOKIE_NAME}=; Path=/; Max-Age=0");
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), "out").into_response())
}

/// `HELLO <display name>`
pub async fn hello(_user: LoggedIn, State(state): State<AppState>) -> Result<String, ApiError> {
    let name = state.coordinator.display_name().await?;
    Ok(format!("HELLO {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn tokens_verify_until_revoked() {
        let tokens = SessionToken::default();
        assert!(!tokens.verify(""));

        let first = tokens.issue();
        assert!(tokens.verify(&first));

        let second = tokens.issue();
        assert!(!tokens.verify(&first));
        assert!(tokens.verify(&second));

        tokens.revoke();
        assert!(!tokens.verify(&second));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; user=abc123"));
        assert_eq!(cookie_value(&headers, "user"), Some("abc123"));
        assert_eq!(cookie_value(&headers, "session"), None);
    }
}
