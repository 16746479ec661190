use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use ticket_info_api::retry::RetryConfig;
use ticket_info_api::ApiClient;
use ticket_info_auth::resolve_token;
use ticket_info_config::{ClientConfig, RetrySettings};
use tracing::debug;

use crate::client::{validate_ticket_id, TicketClient};
use crate::custom_fields::collect_custom_fields;
use crate::document::Description;
use crate::error::{Result, TicketError};
use crate::ticket::TicketInfo;

/// Looks tickets up through the tracker's REST API (`/rest/api/3/issue/{id}`).
#[derive(Clone)]
pub struct ApiTicketClient {
    client: ApiClient,
    custom_fields: BTreeMap<String, String>,
}

impl ApiTicketClient {
    /// Requires `base_url`, `email` and a token (config or `JIRA_API_TOKEN`).
    /// Nothing is sent over the network here.
    pub fn new(config: &ClientConfig, retry: &RetrySettings) -> Result<Self> {
        let base_url = required(config.base_url.as_deref(), "base_url")?;
        let email = required(config.email.as_deref(), "email")?;
        let token = resolve_token(config.token.as_deref()).ok_or_else(|| {
            TicketError::Configuration(
                "API mode requires a token (set tracker.token or JIRA_API_TOKEN)".to_string(),
            )
        })?;

        let client = ApiClient::new(base_url)?
            .with_basic_auth(email, token)
            .with_retry_config(retry_config(retry));

        Ok(Self {
            client,
            custom_fields: config.custom_fields.clone(),
        })
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TicketError::Configuration(format!("API mode requires {name}")))
}

fn retry_config(settings: &RetrySettings) -> RetryConfig {
    RetryConfig {
        max_retries: settings.max_retries,
        base_delay: settings.base_delay(),
        max_delay: settings.max_delay(),
        ..Default::default()
    }
}

#[async_trait]
impl TicketClient for ApiTicketClient {
    fn is_available(&self) -> bool {
        self.client.has_credentials()
    }

    async fn fetch_ticket_details(&self, ticket_id: &str) -> Result<TicketInfo> {
        if !self.is_available() {
            return Err(TicketError::Unavailable(
                "API client is missing credentials".to_string(),
            ));
        }
        validate_ticket_id(ticket_id)?;

        let issue: IssueResponse = self
            .client
            .get(&format!("/rest/api/3/issue/{ticket_id}"))
            .await?;

        debug!(ticket_id, "Fetched issue");
        issue.into_ticket_info(&self.custom_fields)
    }
}

#[derive(Debug, Default, Deserialize)]
struct IssueResponse {
    #[serde(default)]
    fields: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    #[serde(default)]
    issuetype: Option<Named>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    status: Option<Named>,
    #[serde(default)]
    priority: Option<Named>,
    #[serde(default)]
    description: Option<Description>,
}

#[derive(Debug, Default, Deserialize)]
struct Named {
    #[serde(default)]
    name: Option<String>,
}

fn name_of(named: Option<Named>) -> String {
    named.and_then(|n| n.name).unwrap_or_default()
}

impl IssueResponse {
    /// Custom fields are looked up in the raw `fields` object, so a mapping
    /// may also name a standard field such as `priority`.
    fn into_ticket_info(self, custom_fields: &BTreeMap<String, String>) -> Result<TicketInfo> {
        let raw = self.fields.unwrap_or_default();
        let fields: IssueFields = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| TicketError::Parse(format!("unexpected issue fields: {e}")))?;

        Ok(TicketInfo {
            custom_fields: collect_custom_fields(custom_fields, &raw),
            issue_type: name_of(fields.issuetype),
            summary: fields.summary.unwrap_or_default(),
            status: name_of(fields.status),
            priority: name_of(fields.priority),
            description: fields
                .description
                .map(|d| d.to_text())
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api_config() -> ClientConfig {
        ClientConfig {
            mode: Some("api".to_string()),
            base_url: Some("https://example.atlassian.net".to_string()),
            email: Some("me@example.com".to_string()),
            token: Some("token".to_string()),
            ..Default::default()
        }
    }

    fn parse(value: Value, custom: &BTreeMap<String, String>) -> TicketInfo {
        serde_json::from_value::<IssueResponse>(value)
            .unwrap()
            .into_ticket_info(custom)
            .unwrap()
    }

    #[test]
    fn test_new_requires_base_url() {
        let config = ClientConfig {
            base_url: None,
            ..api_config()
        };
        let err = ApiTicketClient::new(&config, &RetrySettings::default()).err().unwrap();
        assert!(matches!(err, TicketError::Configuration(ref m) if m.contains("base_url")));
    }

    #[test]
    fn test_new_requires_email() {
        let config = ClientConfig {
            email: Some("  ".to_string()),
            ..api_config()
        };
        let err = ApiTicketClient::new(&config, &RetrySettings::default()).err().unwrap();
        assert!(matches!(err, TicketError::Configuration(ref m) if m.contains("email")));
    }

    #[test]
    fn test_new_rejects_malformed_base_url() {
        let config = ClientConfig {
            base_url: Some("not a url".to_string()),
            ..api_config()
        };
        assert!(matches!(
            ApiTicketClient::new(&config, &RetrySettings::default()),
            Err(TicketError::Configuration(_))
        ));
    }

    #[test]
    fn test_new_with_full_config_is_available() {
        let client = ApiTicketClient::new(&api_config(), &RetrySettings::default()).unwrap();
        assert!(client.is_available());
    }

    #[test]
    fn test_retry_settings_are_forwarded() {
        let settings = RetrySettings {
            max_retries: 7,
            base_delay_ms: 10,
            max_delay_ms: 20,
        };
        let config = retry_config(&settings);
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.base_delay.as_millis(), 10);
        assert_eq!(config.max_delay.as_millis(), 20);
    }

    #[test]
    fn test_full_issue_parsed() {
        let info = parse(
            json!({
                "key": "TEST-1",
                "fields": {
                    "issuetype": {"name": "Bug"},
                    "summary": "Crash on save",
                    "status": {"name": "In Progress"},
                    "priority": {"name": "High"},
                    "description": {
                        "type": "doc",
                        "content": [
                            {"type": "paragraph", "content": [{"type": "text", "text": "Steps"}]}
                        ]
                    }
                }
            }),
            &BTreeMap::new(),
        );

        assert_eq!(info.issue_type, "Bug");
        assert_eq!(info.summary, "Crash on save");
        assert_eq!(info.status, "In Progress");
        assert_eq!(info.priority, "High");
        assert_eq!(info.description, "Steps");
        assert!(info.custom_fields.is_none());
    }

    #[test]
    fn test_missing_and_null_fields_are_empty() {
        let info = parse(
            json!({
                "fields": {
                    "issuetype": null,
                    "summary": null,
                    "status": {},
                    "description": null
                }
            }),
            &BTreeMap::new(),
        );
        assert_eq!(info, TicketInfo::default());

        assert_eq!(parse(json!({}), &BTreeMap::new()), TicketInfo::default());
        assert_eq!(parse(json!({"fields": null}), &BTreeMap::new()), TicketInfo::default());
    }

    #[test]
    fn test_custom_fields_extracted() {
        let mapping = BTreeMap::from([
            ("Team".to_string(), "customfield_10001".to_string()),
            ("Labels".to_string(), "customfield_10002".to_string()),
            ("Unset".to_string(), "customfield_10003".to_string()),
        ]);
        let info = parse(
            json!({
                "fields": {
                    "summary": "s",
                    "customfield_10001": {"value": "Platform", "id": "1"},
                    "customfield_10002": ["a", "b"],
                    "customfield_10003": null
                }
            }),
            &mapping,
        );

        let custom = info.custom_fields.unwrap();
        assert_eq!(custom.len(), 2);
        assert_eq!(custom["Team"], "Platform");
        assert_eq!(custom["Labels"], "a, b");
    }

    #[test]
    fn test_custom_fields_may_name_standard_fields() {
        let mapping = BTreeMap::from([
            ("Prio".to_string(), "priority".to_string()),
            ("Lbl".to_string(), "labels".to_string()),
        ]);
        let info = parse(
            json!({
                "fields": {
                    "priority": {"name": "High"},
                    "labels": ["a"]
                }
            }),
            &mapping,
        );

        assert_eq!(info.priority, "High");
        let custom = info.custom_fields.unwrap();
        assert_eq!(custom["Prio"], "High");
        assert_eq!(custom["Lbl"], "a");
    }

    #[test]
    fn test_mistyped_standard_field_is_parse_error() {
        let issue: IssueResponse =
            serde_json::from_value(json!({"fields": {"summary": 42}})).unwrap();
        assert!(matches!(
            issue.into_ticket_info(&BTreeMap::new()),
            Err(TicketError::Parse(_))
        ));
    }
}
