//! Ticket metadata lookup.
//!
//! A [`TicketClient`] turns a ticket ID into a normalized [`TicketInfo`],
//! either by running the tracker's CLI ([`CliClient`]) or by calling its REST
//! API ([`ApiTicketClient`]). Use [`new_client`] to pick one from
//! configuration.

pub mod api_client;
pub mod cli_client;
pub mod client;
pub mod custom_fields;
pub mod document;
pub mod error;
pub mod ticket;

pub use api_client::ApiTicketClient;
pub use cli_client::{parse_cli_output, CliClient};
pub use client::{new_client, TicketClient};
pub use custom_fields::extract_custom_field_value;
pub use document::{extract_text, Document};
pub use error::{Result, TicketError};
pub use ticket::TicketInfo;
