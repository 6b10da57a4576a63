//! Best-effort mutation of internal bookkeeping tables.
//!
//! Internal tables (live tasks, listeners, cache indices, server map) must
//! never become a source of caller-visible failure. Every mutation of such a
//! table goes through [`with_table`]: a poisoned lock or a panic inside the
//! closure is logged and turned into `None`, and the caller carries on.
//!
//! Panics are isolated with `catch_unwind` + `AssertUnwindSafe`, so a table
//! may be left half-updated if the closure panics midway. Callers keep their
//! closures to single, self-contained mutations.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;

/// Runs `f` against the table behind `lock`.
///
/// Returns `None` (and logs at `warn`) if the lock is poisoned or `f` panics.
pub fn with_table<T, R>(lock: &Mutex<T>, what: &'static str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
    let mut guard = match lock.lock() {
        Ok(g) => g,
        Err(_) => {
            tracing::warn!(table = what, "bookkeeping skipped: table lock poisoned");
            return None;
        }
    };

    match catch_unwind(AssertUnwindSafe(|| f(&mut guard))) {
        Ok(r) => Some(r),
        Err(panic) => {
            tracing::warn!(
                table = what,
                panic = %panic_message(panic.as_ref()),
                "bookkeeping skipped: mutation panicked"
            );
            None
        }
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn returns_closure_result() {
        let table = Mutex::new(vec![1, 2]);
        let len = with_table(&table, "test", |t| {
            t.push(3);
            t.len()
        });
        assert_eq!(len, Some(3));
    }

    #[test]
    fn panic_inside_mutation_is_contained() {
        let table = Mutex::new(Vec::<u8>::new());
        let r: Option<()> = with_table(&table, "test", |_| panic!("trap"));
        assert!(r.is_none());
        // The guard lives outside the unwinding closure, so the lock stays usable.
        assert_eq!(with_table(&table, "test", |t| t.len()), Some(0));
    }

    #[test]
    fn poisoned_lock_is_skipped() {
        let table = Arc::new(Mutex::new(0u32));
        let t2 = Arc::clone(&table);
        let _ = std::thread::spawn(move || {
            let _g = t2.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert!(with_table(&table, "test", |v| *v += 1).is_none());
    }
}
