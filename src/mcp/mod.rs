//! # Tool servers (MCP-style): configuration, client contract, connection manager.
//!
//! - [`McpConfig`] / [`ServerConfig`] - what to connect to
//! - [`ToolServerClient`] / [`ClientFactory`] - the transport boundary
//! - [`ToolServerManager`] - connection lifecycle kept in sync with the registry

mod client;
mod config;
mod manager;

pub use client::{ClientFactory, ClientRef, Connection, ServerInfo, ToolServerClient};
pub use config::{McpConfig, ServerConfig, TransportConfig};
pub use manager::ToolServerManager;
