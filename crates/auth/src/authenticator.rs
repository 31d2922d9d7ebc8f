use std::sync::Arc;

use chrono::Utc;
use reqwest::{header, StatusCode};
use schema::profile::UserProfile;
use serde::Serialize;
use serde_json::Value;

use crate::{constants, profile::profile_from_response};

/// Client for the web platform the launcher account lives on.
#[derive(Clone, Debug)]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: Arc<str>,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(Arc<str>),
    #[error("Invalid email or password")]
    Unauthorized,
    #[error("Access denied: {0}")]
    Forbidden(Arc<str>),
    #[error("Two-factor code required")]
    TwoFactorRequired,
    #[error("The server took too long to respond")]
    Timeout,
    #[error("Unable to reach the server")]
    Unreachable,
    #[error("Server error ({status}): {message}")]
    ServerError {
        status: StatusCode,
        message: Arc<str>,
    },
    #[error("Connection error: {0}")]
    Network(reqwest::Error),
}

impl AuthError {
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unreachable | Self::Network(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Unreachable
        } else {
            Self::Network(error)
        }
    }
}

#[derive(Serialize)]
struct AuthenticateRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

impl PlatformClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(self.endpoint(path))
            .header(header::ACCEPT, "application/json")
            .header("X-Requested-With", "XMLHttpRequest")
            .header(header::USER_AGENT, constants::USER_AGENT)
            .timeout(constants::REQUEST_TIMEOUT)
    }

    pub async fn authenticate(&self, email: &str, password: &str, code: Option<&str>) -> Result<UserProfile, AuthError> {
        let code = code.map(str::trim).filter(|code| !code.is_empty());
        let response = self.client.post(self.endpoint(constants::AUTHENTICATE_PATH))
            .header(header::ACCEPT, "application/json")
            .header("X-Requested-With", "XMLHttpRequest")
            .header(header::USER_AGENT, constants::USER_AGENT)
            .timeout(constants::REQUEST_TIMEOUT)
            .json(&AuthenticateRequest { email: email.trim(), password, code })
            .send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        let result = classify_response(status, &body);
        match &result {
            Ok(profile) => log::info!("Authenticated as {}", profile.name),
            Err(error) => log::warn!("Authentication failed: {error}"),
        }
        result
    }
}

fn classify_response(status: StatusCode, body: &Value) -> Result<UserProfile, AuthError> {
    if is_two_factor_challenge(body) {
        return Err(AuthError::TwoFactorRequired);
    }

    match status {
        StatusCode::UNPROCESSABLE_ENTITY => Err(AuthError::Validation(validation_message(body))),
        StatusCode::UNAUTHORIZED => Err(AuthError::Unauthorized),
        StatusCode::FORBIDDEN => Err(AuthError::Forbidden(
            message_of(body).unwrap_or_else(|| "account is banned or not allowed".into())
        )),
        status if status.is_success() => {
            profile_from_response(body, Utc::now()).ok_or_else(|| AuthError::ServerError {
                status,
                message: message_of(body).unwrap_or_else(|| "response did not contain an access token".into()),
            })
        },
        status => Err(AuthError::ServerError {
            status,
            message: message_of(body).unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").into()),
        }),
    }
}

fn is_two_factor_challenge(body: &Value) -> bool {
    let field = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_ascii_lowercase);
    let pending = field("status").is_some_and(|status| status == "pending");
    let two_factor_reason = field("reason").is_some_and(|reason| reason.contains("2fa") || reason.contains("two_factor"));
    let two_factor_error = field("error").is_some_and(|error| error == "2fa" || error == "two_factor");
    (pending && two_factor_reason) || two_factor_error || field("reason").is_some_and(|reason| reason == "2fa")
}

fn message_of(body: &Value) -> Option<Arc<str>> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(Into::into)
}

/// Laravel-style `{message, errors: {field: [..]}}` bodies.
fn validation_message(body: &Value) -> Arc<str> {
    let mut parts: Vec<String> = Vec::new();
    if let Some(message) = message_of(body) {
        parts.push(message.to_string());
    }
    if let Some(errors) = body.get("errors").and_then(Value::as_object) {
        for messages in errors.values() {
            match messages {
                Value::Array(messages) => parts.extend(messages.iter().filter_map(Value::as_str).map(str::to_string)),
                Value::String(message) => parts.push(message.clone()),
                _ => {},
            }
        }
    }
    parts.dedup();
    if parts.is_empty() {
        "Invalid request".into()
    } else {
        parts.join(" ").into()
    }
}
