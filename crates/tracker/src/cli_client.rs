use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::client::{validate_ticket_id, TicketClient};
use crate::error::{Result, TicketError};
use crate::ticket::TicketInfo;

/// Executable used when `cli_command` is not configured.
pub const DEFAULT_CLI_COMMAND: &str = "acli";

/// Subcommand that prints a single work item.
const VIEW_ARGS: [&str; 3] = ["jira", "workitem", "view"];

lazy_static! {
    static ref COMMAND_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9_/-]+$").unwrap();
    static ref FIELD_PATTERN: Regex = Regex::new(r"^[A-Z][a-zA-Z\s]*:").unwrap();
}

/// Looks tickets up by running the tracker's command-line tool.
#[derive(Debug, Clone)]
pub struct CliClient {
    command: String,
}

impl CliClient {
    /// Fails if `command` contains anything outside `[A-Za-z0-9_/-]`.
    pub fn new(command: Option<&str>) -> Result<Self> {
        let command = command
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CLI_COMMAND);

        if !COMMAND_PATTERN.is_match(command) {
            return Err(TicketError::Configuration(format!(
                "invalid cli_command {command:?}: only letters, digits, '_', '/' and '-' are allowed"
            )));
        }

        Ok(Self {
            command: command.to_string(),
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn resolve(&self) -> Option<PathBuf> {
        which::which(&self.command).ok()
    }
}

#[async_trait]
impl TicketClient for CliClient {
    fn is_available(&self) -> bool {
        self.resolve().is_some()
    }

    async fn fetch_ticket_details(&self, ticket_id: &str) -> Result<TicketInfo> {
        validate_ticket_id(ticket_id)?;

        let program = self.resolve().ok_or_else(|| {
            TicketError::Unavailable(format!("{} not found in PATH", self.command))
        })?;

        debug!(command = %program.display(), ticket_id, "Invoking tracker CLI");

        let output = Command::new(&program)
            .args(VIEW_ARGS)
            .arg(ticket_id)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TicketError::Unavailable(format!("failed to run {}: {e}", self.command)))?;

        if !output.status.success() {
            return Err(TicketError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| TicketError::Parse(format!("CLI output is not valid UTF-8: {e}")))?;

        parse_cli_output(&stdout)
    }
}

/// Parse `Field: value` lines printed by the tracker CLI.
///
/// `Description:` opens a multi-line block that runs until the next line that
/// looks like a field header (`^[A-Z][a-zA-Z\s]*:`). Such a line inside a
/// description also ends it, even when it was meant as prose.
pub fn parse_cli_output(output: &str) -> Result<TicketInfo> {
    let mut info = TicketInfo::default();
    let mut recognized = false;
    let mut description: Option<Vec<&str>> = None;

    for raw in output.lines() {
        let line = raw.trim();

        if let Some(block) = description.as_mut() {
            if !FIELD_PATTERN.is_match(line) {
                // Leading blank lines are dropped.
                if !line.is_empty() || !block.is_empty() {
                    block.push(raw);
                }
                continue;
            }
            if let Some(block) = description.take() {
                info.description = finish_description(block);
            }
        }

        if let Some(value) = line.strip_prefix("Type:") {
            info.issue_type = value.trim().to_string();
            recognized = true;
        } else if let Some(value) = line.strip_prefix("Summary:") {
            info.summary = value.trim().to_string();
            recognized = true;
        } else if let Some(value) = line.strip_prefix("Status:") {
            info.status = value.trim().to_string();
            recognized = true;
        } else if let Some(inline) = line.strip_prefix("Description:") {
            let inline = inline.trim();
            description = Some(if inline.is_empty() {
                Vec::new()
            } else {
                vec![inline]
            });
            recognized = true;
        }
    }

    if let Some(block) = description {
        info.description = finish_description(block);
    }

    if !recognized {
        return Err(TicketError::Parse(
            "no Type, Summary, Status or Description found in CLI output".to_string(),
        ));
    }

    Ok(info)
}

fn finish_description(mut lines: Vec<&str>) -> String {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
