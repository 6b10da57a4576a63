//! # Action registry: the authoritative `type → action` table.
//!
//! ```text
//!   construction ──► built-ins ──► custom actions (register_custom, all-or-nothing)
//!   tool server  ──► register_bulk(server_id, actions)
//!                       ├─ all inserted          ─► Ok(accepted)
//!                       └─ collision at k-th     ─► remove 0..k-1, Err(BulkRejection)
//!   disconnect   ──► remove_by_origin(Server(id))
//! ```
//!
//! ## Rules
//! - `type` is unique across the whole table at any instant.
//! - Reserved names can only be held by built-ins.
//! - Every entry carries an [`Origin`], used for targeted removal.
//! - Registration either applies fully or leaves the table as it was.
//! - [`ActionRegistry::format`] never panics outward.

use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::actions::{ActionInstance, ActionRef};
use crate::error::{ConflictReason, EngineError};
use crate::fabric::best_effort::{panic_message, with_table};

/// Where an action came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    BuiltIn,
    Custom,
    /// Discovered from the tool server with this id.
    Server(String),
}

impl Origin {
    pub fn is_server(&self) -> bool {
        matches!(self, Origin::Server(_))
    }
}

/// A bulk registration that collided and was rolled back.
#[derive(Error, Debug, Clone)]
#[error("{error} (rolled back {} action(s))", .rolled_back.len())]
pub struct BulkRejection {
    /// The collision that stopped the registration.
    pub error: EngineError,
    /// Actions inserted earlier in the same call and removed again.
    pub rolled_back: Vec<String>,
}

struct Entry {
    action: ActionRef,
    origin: Origin,
}

/// Immutable snapshot of the registry handed to a task.
#[derive(Clone, Default)]
pub struct ActionSet(Arc<[ActionRef]>);

impl ActionSet {
    pub fn get(&self, kind: &str) -> Option<&ActionRef> {
        self.0.iter().find(|a| a.kind() == kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.0.iter().map(|a| a.kind()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionRef> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Name-keyed table of action definitions.
pub struct ActionRegistry {
    table: Mutex<HashMap<String, Entry>>,
    reserved: HashSet<String>,
}

impl ActionRegistry {
    /// Creates a registry seeded with `builtins`.
    ///
    /// Built-ins may hold reserved names. A duplicate built-in replaces the earlier one.
    pub fn new(reserved: impl IntoIterator<Item = String>, builtins: Vec<ActionRef>) -> Self {
        let table = builtins
            .into_iter()
            .filter_map(|action| {
                let kind = read_kind(&action)?;
                Some((
                    kind,
                    Entry {
                        action,
                        origin: Origin::BuiltIn,
                    },
                ))
            })
            .collect();
        Self {
            table: Mutex::new(table),
            reserved: reserved.into_iter().collect(),
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, table: &HashMap<String, Entry>, kind: &str) -> Result<(), EngineError> {
        if self.reserved.contains(kind) {
            return Err(conflict(kind, ConflictReason::Reserved));
        }
        if table.contains_key(kind) {
            return Err(conflict(kind, ConflictReason::Duplicate));
        }
        Ok(())
    }

    /// Registers construction-time custom actions, all or nothing.
    pub fn register_custom(&self, actions: Vec<ActionRef>) -> Result<(), EngineError> {
        let mut table = self.table();

        let mut staged: Vec<(String, ActionRef)> = Vec::with_capacity(actions.len());
        let mut seen = HashSet::new();
        for action in actions {
            let kind = read_kind(&action)
                .ok_or_else(|| EngineError::invalid_input("custom action type is unreadable"))?;
            self.check(&table, &kind)?;
            if !seen.insert(kind.clone()) {
                return Err(conflict(&kind, ConflictReason::Duplicate));
            }
            staged.push((kind, action));
        }

        for (kind, action) in staged {
            tracing::debug!(action = %kind, "custom action registered");
            table.insert(
                kind,
                Entry {
                    action,
                    origin: Origin::Custom,
                },
            );
        }
        Ok(())
    }

    /// Registers the actions discovered from one tool server.
    ///
    /// Inserts in order; on the first collision every action inserted by this
    /// call is removed again before the error is returned.
    pub fn register_bulk(&self, server_id: &str, actions: Vec<ActionRef>) -> Result<Vec<String>, BulkRejection> {
        let mut table = self.table();
        let mut accepted: Vec<String> = Vec::with_capacity(actions.len());

        for action in actions {
            let checked = read_kind(&action)
                .ok_or_else(|| EngineError::invalid_input("remote action type is unreadable"))
                .and_then(|kind| self.check(&table, &kind).map(|()| kind));

            match checked {
                Ok(kind) => {
                    table.insert(
                        kind.clone(),
                        Entry {
                            action,
                            origin: Origin::Server(server_id.to_string()),
                        },
                    );
                    accepted.push(kind);
                }
                Err(error) => {
                    for kind in &accepted {
                        table.remove(kind);
                    }
                    tracing::warn!(
                        server = server_id,
                        rolled_back = accepted.len(),
                        error = %error,
                        "tool server registration rolled back"
                    );
                    return Err(BulkRejection {
                        error,
                        rolled_back: accepted,
                    });
                }
            }
        }
        Ok(accepted)
    }

    /// Removes every action with the given origin; best effort.
    pub fn remove_by_origin(&self, origin: &Origin) -> Vec<String> {
        self.remove_where("action_registry", |o| o == origin)
    }

    /// Removes every tool-server action regardless of server; best effort.
    pub fn remove_all_server_actions(&self) -> Vec<String> {
        self.remove_where("action_registry", Origin::is_server)
    }

    fn remove_where(&self, what: &'static str, pred: impl Fn(&Origin) -> bool) -> Vec<String> {
        with_table(&self.table, what, |table| {
            let mut removed: Vec<String> = table
                .iter()
                .filter(|(_, e)| pred(&e.origin))
                .map(|(k, _)| k.clone())
                .collect();
            for kind in &removed {
                table.remove(kind);
            }
            removed.sort_unstable();
            removed
        })
        .unwrap_or_default()
    }

    pub fn lookup(&self, kind: &str) -> Option<ActionRef> {
        self.table().get(kind).map(|e| Arc::clone(&e.action))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.table().contains_key(kind)
    }

    pub fn origin_of(&self, kind: &str) -> Option<Origin> {
        self.table().get(kind).map(|e| e.origin.clone())
    }

    /// Sorted action types with the given origin.
    pub fn kinds_from(&self, origin: &Origin) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .table()
            .iter()
            .filter(|(_, e)| &e.origin == origin)
            .map(|(k, _)| k.clone())
            .collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn is_reserved(&self, kind: &str) -> bool {
        self.reserved.contains(kind)
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all actions, sorted by type.
    pub fn snapshot(&self) -> ActionSet {
        let table = self.table();
        let mut entries: Vec<(&String, &Entry)> = table.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        ActionSet(entries.into_iter().map(|(_, e)| Arc::clone(&e.action)).collect())
    }

    /// Human-readable rendering of an invocation.
    ///
    /// Returns an empty string when the action is unknown, has no formatter,
    /// or its formatter panics.
    pub fn format(&self, instance: &ActionInstance) -> String {
        let Some(action) = self.lookup(&instance.kind) else {
            return String::new();
        };
        match catch_unwind(AssertUnwindSafe(|| action.format(&instance.params))) {
            Ok(rendered) => rendered.unwrap_or_default(),
            Err(panic) => {
                tracing::warn!(
                    action = %instance.kind,
                    panic = %panic_message(panic.as_ref()),
                    "action formatter panicked"
                );
                String::new()
            }
        }
    }
}

fn conflict(kind: &str, reason: ConflictReason) -> EngineError {
    EngineError::RegistrationConflict {
        action: kind.to_string(),
        reason,
    }
}

/// Reads an action's type, tolerating implementations whose accessor panics.
fn read_kind(action: &ActionRef) -> Option<String> {
    match catch_unwind(AssertUnwindSafe(|| action.kind().to_string())) {
        Ok(kind) => Some(kind),
        Err(panic) => {
            tracing::warn!(panic = %panic_message(panic.as_ref()), "action type accessor panicked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, ActionContext, ActionFn, ActionOutcome, builtin};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::{Value, json};

    fn action(kind: &str) -> ActionRef {
        ActionFn::new(kind.to_string(), |_ctx: ActionContext, _p: Value| async {
            ActionOutcome::ok("")
        })
        .into_ref()
    }

    fn registry() -> ActionRegistry {
        ActionRegistry::new(
            builtin::RESERVED.iter().map(|s| s.to_string()),
            builtin::builtin_actions(),
        )
    }

    struct Hostile;

    #[async_trait]
    impl Action for Hostile {
        fn kind(&self) -> &str {
            panic!("type accessor trapped")
        }
        async fn run(&self, _ctx: ActionContext, _p: Value) -> ActionOutcome {
            ActionOutcome::ok("")
        }
    }

    #[test]
    fn custom_registration_is_all_or_nothing() {
        let reg = registry();
        let before = reg.len();

        let err = reg
            .register_custom(vec![action("scroll"), action("complete")])
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::RegistrationConflict { reason: ConflictReason::Reserved, .. }
        ));
        assert_eq!(reg.len(), before);
        assert!(!reg.contains("scroll"));

        let err = reg
            .register_custom(vec![action("scroll"), action("scroll")])
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::RegistrationConflict { reason: ConflictReason::Duplicate, .. }
        ));
        assert_eq!(reg.len(), before);

        reg.register_custom(vec![action("scroll")]).unwrap();
        assert_eq!(reg.origin_of("scroll"), Some(Origin::Custom));
    }

    #[test]
    fn bulk_collision_with_builtin_rolls_back() {
        let reg = registry();
        let rejection = reg
            .register_bulk("srv-1", vec![action("search"), action("wait")])
            .unwrap_err();
        assert_eq!(rejection.rolled_back, vec!["search".to_string()]);
        assert!(!reg.contains("search"));
        assert_eq!(reg.origin_of("wait"), Some(Origin::BuiltIn));
    }

    #[test]
    fn remove_by_origin_is_targeted() {
        let reg = registry();
        reg.register_bulk("a", vec![action("a_1"), action("a_2")]).unwrap();
        reg.register_bulk("b", vec![action("b_1")]).unwrap();

        let removed = reg.remove_by_origin(&Origin::Server("a".into()));
        assert_eq!(removed, vec!["a_1".to_string(), "a_2".to_string()]);
        assert!(reg.contains("b_1"));

        assert_eq!(reg.remove_all_server_actions(), vec!["b_1".to_string()]);
        assert!(reg.kinds_from(&Origin::Server("b".into())).is_empty());
        assert!(reg.contains(builtin::WAIT));
    }

    #[test]
    fn hostile_type_accessor_is_refused() {
        let reg = registry();
        let before = reg.len();
        let hostile: ActionRef = Arc::new(Hostile);

        assert!(reg.register_custom(vec![hostile.clone()]).is_err());
        let rejection = reg
            .register_bulk("srv", vec![action("fine"), hostile])
            .unwrap_err();
        assert_eq!(rejection.rolled_back, vec!["fine".to_string()]);
        assert_eq!(reg.len(), before);
    }

    #[test]
    fn format_never_panics() {
        let reg = registry();
        let exploding = ActionFn::new("explode", |_ctx: ActionContext, _p: Value| async {
            ActionOutcome::ok("")
        })
        .with_formatter(|_| panic!("formatter trapped"))
        .into_ref();
        reg.register_custom(vec![exploding]).unwrap();

        assert_eq!(reg.format(&ActionInstance::new("explode", json!({}))), "");
        assert_eq!(reg.format(&ActionInstance::new("missing", json!({}))), "");
        assert_eq!(
            reg.format(&ActionInstance::new("wait", json!({"duration_ms": 5}))),
            "wait 5ms"
        );
    }

    #[test]
    fn snapshot_is_sorted_and_detached() {
        let reg = registry();
        let snap = reg.snapshot();
        reg.register_custom(vec![action("zoom")]).unwrap();

        assert_eq!(snap.kinds(), vec!["complete", "complete_with_output_schema", "wait"]);
        assert!(snap.get("zoom").is_none());
    }

    proptest! {
        #[test]
        fn kth_collision_persists_nothing(n in 1usize..12, k_seed in any::<usize>(), reserved in any::<bool>()) {
            let reg = registry();
            let before = reg.kinds_from(&Origin::BuiltIn);
            let k = k_seed % n;

            let mut batch: Vec<ActionRef> = (0..n).map(|i| action(&format!("tool_{i}"))).collect();
            batch[k] = action(if reserved { builtin::COMPLETE } else { builtin::WAIT });

            let rejection = reg.register_bulk("srv", batch).unwrap_err();
            prop_assert_eq!(rejection.rolled_back.len(), k);
            prop_assert_eq!(reg.len(), before.len());
            prop_assert!(reg.kinds_from(&Origin::Server("srv".into())).is_empty());
        }
    }
}
