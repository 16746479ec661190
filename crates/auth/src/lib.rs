use std::fmt;

/// Environment variable that overrides any configured API token.
pub const TOKEN_ENV_VAR: &str = "JIRA_API_TOKEN";

/// Resolve the API token for the tracker.
///
/// A non-blank `JIRA_API_TOKEN` always wins over the configured value.
pub fn resolve_token(configured: Option<&str>) -> Option<String> {
    select_token(std::env::var(TOKEN_ENV_VAR).ok(), configured)
}

fn select_token(env_value: Option<String>, configured: Option<&str>) -> Option<String> {
    env_value
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            configured
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string)
        })
}

/// Email + API token pair sent as HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    token: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}
