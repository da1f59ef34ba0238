//! Wire vocabulary for the stdin/stdout JSON protocol.
//!
//! Every exchange is one JSON object per line: the parent sends
//! `{"cmd": ...}` commands, we answer with `{"event": ...}` events. This
//! module only defines the shapes and converts between them and text; all
//! reading, writing, and flushing belongs to the bridge loop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Events sent to the controlling parent process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum BridgeEvent {
    /// Device opened successfully; the bridge is accepting commands.
    Ready,
    /// One tag read, identifier as uppercase hex.
    Tag { epc: String },
    /// Recoverable diagnostic. Never terminates the process by itself.
    Error { message: String },
}

impl BridgeEvent {
    pub fn error(message: impl Into<String>) -> Self {
        BridgeEvent::Error {
            message: message.into(),
        }
    }
}

/// Commands accepted from the controlling parent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Shutdown,
}

/// Why an inbound line could not be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("bad JSON: {0}")]
    Malformed(String),
    #[error("unknown command: {0:?}")]
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    cmd: String,
}

/// Serialize one event to a single JSON line (without the trailing newline).
pub fn encode(event: &BridgeEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

/// Parse one inbound line. Blank lines are ignored and yield `Ok(None)`;
/// the `cmd` value is matched case-insensitively.
pub fn decode(line: &str) -> Result<Option<Command>, DecodeError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let raw: RawCommand =
        serde_json::from_str(trimmed).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    match raw.cmd.to_lowercase().as_str() {
        "start" => Ok(Some(Command::Start)),
        "stop" => Ok(Some(Command::Stop)),
        "shutdown" => Ok(Some(Command::Shutdown)),
        _ => Err(DecodeError::Unknown(raw.cmd)),
    }
}

/// Uppercase hex rendering of a tag identifier, two digits per byte.
pub fn epc_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out
}
