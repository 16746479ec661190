pub mod error;
pub mod retry;

use std::collections::BTreeMap;

use chrono::Utc;
use error::{ApiError, Result};
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use retry::{parse_retry_after, retry_on_rate_limit, RetryConfig};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use ticket_info_auth::Credentials;
use tracing::{debug, error};
use url::Url;

/// Per-request timeout applied to every HTTP call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
    retry_config: RetryConfig,
}

impl ApiClient {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        // A trailing slash keeps any path prefix intact when joining.
        let normalized = format!("{}/", base_url.as_ref().trim().trim_end_matches('/'));
        let url = Url::parse(&normalized).map_err(ApiError::InvalidUrl)?;

        let client = Client::builder()
            .user_agent(format!("ticket-info/{}", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ApiError::RequestFailed)?;

        Ok(Self {
            client,
            base_url: url,
            credentials: None,
            retry_config: RetryConfig::default(),
        })
    }

    pub fn with_basic_auth(mut self, email: impl Into<String>, token: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(email, token));
        self
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// GET `path` and decode a 200 JSON body, retrying on HTTP 429.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let joined = self
            .base_url
            .join(path.strip_prefix('/').unwrap_or(path))
            .map_err(ApiError::InvalidUrl)?;

        debug!(url = %joined, "Sending request");

        retry_on_rate_limit(&self.retry_config, || async {
            let req = self
                .client
                .get(joined.clone())
                .header(ACCEPT, "application/json");

            let response = self
                .apply_auth(req)
                .send().await.map_err(ApiError::RequestFailed)?;
            let status = response.status();

            match status {
                StatusCode::OK => response.json::<T>().await.map_err(|e| {
                    error!("Failed to parse JSON response: {}", e);
                    ApiError::InvalidResponse(e.to_string())
                }),
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| parse_retry_after(s, Utc::now()));
                    Err(ApiError::RateLimitExceeded { retry_after })
                }
                StatusCode::UNAUTHORIZED => Err(ApiError::AuthenticationFailed {
                    message: error_message(response)
                        .await
                        .unwrap_or_else(|| "Invalid or expired credentials".to_string()),
                }),
                StatusCode::FORBIDDEN => Err(ApiError::PermissionDenied {
                    message: error_message(response)
                        .await
                        .unwrap_or_else(|| "Not authorized to access this resource".to_string()),
                }),
                StatusCode::NOT_FOUND => {
                    let resource = joined.path().to_string();
                    let message = error_message(response)
                        .await
                        .unwrap_or_else(|| "Does not exist".to_string());
                    Err(ApiError::NotFound { resource, message })
                }
                _ => {
                    let message = error_message(response)
                        .await
                        .unwrap_or_else(|| format!("Unexpected status: {}", status));
                    Err(ApiError::ServerError {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
        })
        .await
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => request.basic_auth(credentials.email(), Some(credentials.token())),
            None => request,
        }
    }
}

/// Error payload returned by Jira-style REST APIs.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, rename = "errorMessages")]
    error_messages: Option<Vec<String>>,
    #[serde(default)]
    errors: Option<BTreeMap<String, Value>>,
}

async fn error_message(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;
    parse_error_body(&body)
}

fn parse_error_body(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;

    let messages: Vec<String> = parsed
        .error_messages
        .unwrap_or_default()
        .into_iter()
        .chain(
            parsed
                .errors
                .unwrap_or_default()
                .into_iter()
                .map(|(field, message)| match message {
                    Value::String(text) => format!("{field}: {text}"),
                    other => format!("{field}: {other}"),
                }),
        )
        .filter(|m| !m.trim().is_empty())
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}
