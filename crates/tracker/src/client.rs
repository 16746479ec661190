use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use ticket_info_config::Config;
use tracing::debug;

use crate::api_client::ApiTicketClient;
use crate::cli_client::CliClient;
use crate::error::{Result, TicketError};
use crate::ticket::TicketInfo;

lazy_static! {
    static ref TICKET_ID_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").unwrap();
}

/// A source of ticket metadata.
///
/// Implementations hold only immutable configuration, so one instance can
/// serve any number of concurrent lookups.
#[async_trait]
pub trait TicketClient: Send + Sync {
    /// Whether the backing mechanism can be invoked right now.
    fn is_available(&self) -> bool;

    async fn fetch_ticket_details(&self, ticket_id: &str) -> Result<TicketInfo>;
}

/// Build the client selected by `tracker.mode`.
///
/// `"api"` selects the REST client; `"cli"` or no mode selects the CLI
/// client. There is no automatic fallback between the two.
pub fn new_client(config: &Config) -> Result<Box<dyn TicketClient>> {
    let mode = config.tracker.mode.as_deref().map(str::trim).unwrap_or("");
    debug!(mode, "Selecting ticket client");

    match mode {
        "api" => Ok(Box::new(ApiTicketClient::new(&config.tracker, &config.retry)?)),
        "" | "cli" => Ok(Box::new(CliClient::new(config.tracker.cli_command.as_deref())?)),
        other => Err(TicketError::Configuration(format!(
            "unknown mode {other:?} (expected \"cli\" or \"api\")"
        ))),
    }
}

/// Ticket IDs end up in a URL path and on a command line, so only a
/// conservative character set is accepted.
pub(crate) fn validate_ticket_id(ticket_id: &str) -> Result<()> {
    if TICKET_ID_PATTERN.is_match(ticket_id) {
        Ok(())
    } else {
        Err(TicketError::InvalidTicketId(ticket_id.to_string()))
    }
}
