//! # Remote tool-server client contract.
//!
//! The engine does not speak the tool-server protocol itself. It drives a
//! [`ToolServerClient`] that connects, discovers tools and hands them back as
//! ready-made actions.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::actions::ActionRef;
use crate::error::TransportError;
use crate::mcp::ServerConfig;

/// A freshly established connection.
pub struct Connection {
    /// Id issued by the client.
    pub server_id: String,
    /// Actions wrapping the server's tools.
    pub actions: Vec<ActionRef>,
}

/// Descriptive information about a connected server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub id: String,
    pub name: Option<String>,
    pub tools: Vec<String>,
}

/// Transport-agnostic client owning zero or more server connections.
#[async_trait]
pub trait ToolServerClient: Send + Sync + 'static {
    async fn connect(&self, config: &ServerConfig) -> Result<Connection, TransportError>;

    async fn disconnect(&self, server_id: &str) -> Result<(), TransportError>;

    async fn disconnect_all(&self) -> Result<(), TransportError>;

    fn list_server_ids(&self) -> Vec<String>;

    fn list_server_info(&self) -> Vec<ServerInfo>;
}

/// Shared handle to a client.
pub type ClientRef = Arc<dyn ToolServerClient>;

/// Builds a fresh client; called lazily and on every reinitialization.
pub trait ClientFactory: Send + Sync + 'static {
    fn create(&self) -> Result<ClientRef, TransportError>;
}

impl<F> ClientFactory for F
where
    F: Fn() -> Result<ClientRef, TransportError> + Send + Sync + 'static,
{
    fn create(&self) -> Result<ClientRef, TransportError> {
        self()
    }
}
