//! # Tool-server connection manager.
//!
//! Owns the client, the `server id → contributed action types` map, and keeps
//! that map in agreement with the [`ActionRegistry`].
//!
//! ```text
//! connect_to_server(cfg)
//!   ├─► client.connect(cfg) ──Err──► log (sanitized) ─► None
//!   ├─► id already connected ──────► ServerRejected ─► None   (transport untouched)
//!   └─► registry.register_bulk(id, actions)
//!          ├─ Ok  ─► servers[id] = accepted ─► ServerConnected ─► Some(id)
//!          └─ Err ─► ServerRejected ─► client.disconnect(id) ─► None
//!
//! disconnect_server(id)
//!   ├─ blank / unknown ─► false (client untouched)
//!   └─► servers.remove(id) ─► registry.remove_by_origin(id) ─► client.disconnect(id)
//!                                                             (failure logged only)
//! reinitialize(cfg)
//!   old.disconnect_all() (failure logged) ─► clear map + all server actions
//!   ─► factory.create() ─► connect_to_server(each)   (one failure never stops the rest)
//! ```
//!
//! ## Rules
//! - Nothing here returns an error: transport failures become `None`/`false` and a log line.
//! - A server never stays connected with its actions rolled back.
//! - Action cleanup happens before transport teardown, so tool definitions never
//!   outlive a broken connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::actions::{ActionRegistry, Origin};
use crate::events::{Bus, Event, EventKind};
use crate::fabric::best_effort::with_table;
use crate::fabric::diag;
use crate::mcp::{ClientFactory, ClientRef, McpConfig, ServerConfig, ServerInfo};

/// Connection lifecycle for remote tool servers.
pub struct ToolServerManager {
    registry: Arc<ActionRegistry>,
    factory: Option<Arc<dyn ClientFactory>>,
    client: Mutex<Option<ClientRef>>,
    servers: Mutex<HashMap<String, Vec<String>>>,
    bus: Bus,
    max_diag: usize,
}

impl ToolServerManager {
    pub fn new(
        registry: Arc<ActionRegistry>,
        factory: Option<Arc<dyn ClientFactory>>,
        bus: Bus,
        max_diag: usize,
    ) -> Self {
        Self {
            registry,
            factory,
            client: Mutex::new(None),
            servers: Mutex::new(HashMap::new()),
            bus,
            max_diag,
        }
    }

    fn current_client(&self) -> Option<ClientRef> {
        with_table(&self.client, "mcp_client", |c| c.clone()).flatten()
    }

    /// Existing client, or a new one from the factory.
    fn ensure_client(&self) -> Option<ClientRef> {
        if let Some(c) = self.current_client() {
            return Some(c);
        }
        let Some(factory) = self.factory.as_ref() else {
            tracing::warn!("no tool-server client factory configured");
            return None;
        };
        match factory.create() {
            Ok(fresh) => {
                let stored = with_table(&self.client, "mcp_client", |slot| {
                    slot.get_or_insert_with(|| Arc::clone(&fresh)).clone()
                });
                Some(stored.unwrap_or(fresh))
            }
            Err(e) => {
                tracing::error!(error = %self.clip(&e.to_string()), "tool-server client construction failed");
                None
            }
        }
    }

    fn clip(&self, msg: &str) -> String {
        diag::sanitize(msg, self.max_diag)
    }

    /// Connects one server and registers its actions.
    ///
    /// Returns the server id, or `None` on any failure (logged).
    pub async fn connect_to_server(&self, config: &ServerConfig) -> Option<String> {
        let client = self.ensure_client()?;

        let conn = match client.connect(config).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(
                    hint = config.id_hint.as_deref(),
                    label = e.as_label(),
                    error = %self.clip(&e.to_string()),
                    "tool server connect failed"
                );
                return None;
            }
        };

        let server_id = conn.server_id;
        if server_id.trim().is_empty() {
            tracing::error!("tool server connected with a blank id; dropping it");
            if let Err(e) = client.disconnect(&server_id).await {
                tracing::warn!(error = %self.clip(&e.to_string()), "teardown of blank-id server failed");
            }
            return None;
        }

        let taken = with_table(&self.servers, "mcp_servers", |servers| servers.contains_key(&server_id))
            .unwrap_or(false);
        if taken {
            // The transport reused the live connection; tearing it down would orphan its actions.
            tracing::warn!(server = %server_id, "tool server already connected; keeping the existing connection");
            self.bus.publish(
                Event::new(EventKind::ServerRejected)
                    .with_server(server_id.as_str())
                    .with_reason("already connected"),
            );
            return None;
        }

        match self.registry.register_bulk(&server_id, conn.actions) {
            Ok(accepted) => {
                let count = accepted.len();
                let recorded = with_table(&self.servers, "mcp_servers", |servers| {
                    servers.insert(server_id.clone(), accepted);
                });
                if recorded.is_none() {
                    // Map unusable: do not leave actions nobody can remove by id.
                    self.registry.remove_by_origin(&Origin::Server(server_id.clone()));
                    self.teardown(&client, &server_id).await;
                    return None;
                }
                tracing::info!(server = %server_id, actions = count, "tool server connected");
                self.bus.publish(
                    Event::new(EventKind::ServerConnected)
                        .with_server(server_id.as_str())
                        .with_reason(format!("actions={count}")),
                );
                Some(server_id)
            }
            Err(rejection) => {
                self.bus.publish(
                    Event::new(EventKind::ServerRejected)
                        .with_server(server_id.as_str())
                        .with_reason(rejection.to_string()),
                );
                self.teardown(&client, &server_id).await;
                None
            }
        }
    }

    async fn teardown(&self, client: &ClientRef, server_id: &str) {
        if let Err(e) = client.disconnect(server_id).await {
            tracing::warn!(
                server = server_id,
                error = %self.clip(&e.to_string()),
                "tool server teardown failed"
            );
        }
    }

    /// Validates and unregisters a server; returns the client to tear it down with.
    fn detach(&self, server_id: &str) -> Option<Option<ClientRef>> {
        if server_id.trim().is_empty() {
            tracing::warn!("disconnect requested with a blank server id");
            return None;
        }
        let known = with_table(&self.servers, "mcp_servers", |servers| servers.remove(server_id))
            .flatten();
        let Some(kinds) = known else {
            tracing::warn!(server = server_id, "disconnect requested for unknown server");
            return None;
        };

        let removed = self.registry.remove_by_origin(&Origin::Server(server_id.to_string()));
        if removed.len() != kinds.len() {
            tracing::warn!(
                server = server_id,
                expected = kinds.len(),
                removed = removed.len(),
                "server action bookkeeping disagreed with registry"
            );
        }
        self.bus
            .publish(Event::new(EventKind::ServerDisconnected).with_server(server_id));
        Some(self.current_client())
    }

    /// Disconnects a server without waiting for transport teardown.
    ///
    /// Actions are removed before this returns; teardown runs on the current
    /// tokio runtime (or is skipped, logged, when there is none).
    pub fn disconnect_server(&self, server_id: &str) -> bool {
        let Some(client) = self.detach(server_id) else {
            return false;
        };
        let Some(client) = client else {
            return true;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                let id = server_id.to_string();
                let max = self.max_diag;
                rt.spawn(async move {
                    if let Err(e) = client.disconnect(&id).await {
                        tracing::warn!(
                            server = %id,
                            error = %diag::sanitize(&e.to_string(), max),
                            "tool server teardown failed"
                        );
                    }
                });
            }
            Err(_) => {
                tracing::warn!(server = server_id, "no runtime for transport teardown; skipped");
            }
        }
        true
    }

    /// Disconnects a server and waits for transport teardown (failure is logged).
    pub async fn disconnect_server_async(&self, server_id: &str) -> bool {
        let Some(client) = self.detach(server_id) else {
            return false;
        };
        if let Some(client) = client {
            self.teardown(&client, server_id).await;
        }
        true
    }

    /// Drops the client and every server action; best effort throughout.
    async fn reset(&self) {
        let old = with_table(&self.client, "mcp_client", Option::take).flatten();
        if let Some(old) = old {
            if let Err(e) = old.disconnect_all().await {
                tracing::warn!(error = %self.clip(&e.to_string()), "tool-server disconnect_all failed");
            }
        }

        if with_table(&self.servers, "mcp_servers", HashMap::clear).is_none() {
            tracing::warn!("server map unreadable; clearing server actions from registry only");
        }
        let removed = self.registry.remove_all_server_actions();
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "server actions cleared");
        }
    }

    /// Replaces the client and connects every configured server.
    ///
    /// Returns the ids that connected.
    pub async fn reinitialize(&self, config: &McpConfig) -> Vec<String> {
        self.reset().await;

        let mut connected = Vec::new();
        for server in &config.servers {
            if let Some(id) = self.connect_to_server(server).await {
                connected.push(id);
            }
        }
        tracing::info!(
            requested = config.servers.len(),
            connected = connected.len(),
            "tool servers reinitialized"
        );
        connected
    }

    /// Disconnects everything; used on engine shutdown.
    pub async fn shutdown(&self) {
        self.reset().await;
    }

    /// Sorted ids of connected servers.
    pub fn server_ids(&self) -> Vec<String> {
        let mut ids = with_table(&self.servers, "mcp_servers", |s| {
            s.keys().cloned().collect::<Vec<_>>()
        })
        .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Action types contributed by a server.
    pub fn server_actions(&self, server_id: &str) -> Option<Vec<String>> {
        with_table(&self.servers, "mcp_servers", |s| s.get(server_id).cloned()).flatten()
    }

    /// Descriptive info reported by the client.
    pub fn server_info(&self) -> Vec<ServerInfo> {
        self.current_client()
            .map(|c| c.list_server_info())
            .unwrap_or_default()
    }

    /// Ids the client itself reports.
    pub fn client_server_ids(&self) -> Vec<String> {
        self.current_client()
            .map(|c| c.list_server_ids())
            .unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        !self.server_ids().is_empty()
    }
}
