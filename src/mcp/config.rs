//! Tool-server configuration.
//!
//! Transport-agnostic: the engine only passes these through to the
//! [`ToolServerClient`](crate::ToolServerClient) implementation.
//!
//! ```
//! use taskpilot::McpConfig;
//!
//! let cfg = McpConfig::from_json(r#"{
//!     "servers": [
//!         { "id_hint": "files", "transport": { "kind": "stdio", "command": "mcp-files", "args": ["--root", "/tmp"] } },
//!         { "transport": { "kind": "sse", "url": "http://localhost:8931/sse" } }
//!     ]
//! }"#).unwrap();
//! assert_eq!(cfg.servers.len(), 2);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Every server the engine should connect to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl McpConfig {
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// One server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Preferred id; the client decides the final id.
    #[serde(default)]
    pub id_hint: Option<String>,
    pub transport: TransportConfig,
}

/// How to reach a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Child process speaking over stdin/stdout.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    /// Remote server-sent-events endpoint.
    Sse {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

impl ServerConfig {
    pub fn stdio(command: impl Into<String>) -> Self {
        Self {
            id_hint: None,
            transport: TransportConfig::Stdio {
                command: command.into(),
                args: Vec::new(),
                env: BTreeMap::new(),
            },
        }
    }

    pub fn sse(url: impl Into<String>) -> Self {
        Self {
            id_hint: None,
            transport: TransportConfig::Sse {
                url: url.into(),
                headers: BTreeMap::new(),
            },
        }
    }

    pub fn with_id_hint(mut self, id: impl Into<String>) -> Self {
        self.id_hint = Some(id.into());
        self
    }
}
