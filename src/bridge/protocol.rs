//! Wire format between the console and the remote runtime.
//!
//! One serde-serialized JSON object per newline-terminated line, both
//! directions. Three message shapes:
//!   outbound  {"type":"statement","source":"..."}
//!   inbound   {"type":"ready"}
//!   inbound   {"type":"terminated","diagnostic":"..."}
//! Inbound types this build does not know are logged and dropped.

use serde::{Deserialize, Serialize};

/// Outbound payload carrying one completed statement.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound<'a> {
    Statement { source: &'a str },
}

/// Lifecycle messages the runtime sends back over the bridge.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuntimeSignal {
    /// The runtime finished launching and is accepting statements.
    Ready,
    /// The runtime died or reported a fatal condition.
    Terminated {
        #[serde(default)]
        diagnostic: String,
    },
    /// Forward compatibility: unknown types are tolerated, never fatal.
    #[serde(other)]
    Unknown,
}

/// Failures at the transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("no runtime peer connected")]
    NotConnected,

    #[error("encode failed: {source}")]
    Encode {
        #[from]
        source: serde_json::Error,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
