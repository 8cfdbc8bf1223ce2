//! Per-window host bindings.
//!
//! Rebinding a name replaces the previous callable (idempotent overwrite).
//! Callables run on the caller's thread with no registry lock held.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tether_common::{BridgeError, WindowId};
use tracing::{debug, error};

use crate::lifecycle::panic_message;

/// A host function exposed to page script. Receives the call arguments as
/// JSON text and returns a serialized result or an error message.
pub type Binding = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

#[derive(Default)]
pub struct BindingRegistry {
    windows: Mutex<HashMap<WindowId, HashMap<String, Binding>>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a binding. Returns true if a previous binding was
    /// replaced.
    pub fn insert(&self, window: WindowId, name: &str, binding: Binding) -> bool {
        let replaced = self
            .lock()
            .entry(window)
            .or_default()
            .insert(name.to_string(), binding)
            .is_some();
        debug!(window_id = %window, name, replaced, "binding stored");
        replaced
    }

    pub fn contains(&self, window: WindowId, name: &str) -> bool {
        self.lock()
            .get(&window)
            .is_some_and(|names| names.contains_key(name))
    }

    /// Remove one binding. Returns whether it existed.
    pub fn remove(&self, window: WindowId, name: &str) -> bool {
        let mut windows = self.lock();
        let Some(names) = windows.get_mut(&window) else {
            return false;
        };
        let removed = names.remove(name).is_some();
        if names.is_empty() {
            windows.remove(&window);
        }
        removed
    }

    /// Drop every binding of a window. Returns how many were removed.
    pub fn remove_window(&self, window: WindowId) -> usize {
        let removed = self.lock().remove(&window).map_or(0, |names| names.len());
        if removed > 0 {
            debug!(window_id = %window, removed, "bindings released");
        }
        removed
    }

    /// Bound names of a window, sorted.
    pub fn names(&self, window: WindowId) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .get(&window)
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Call a binding with serialized arguments.
    pub fn invoke(&self, window: WindowId, name: &str, args: &str) -> Result<String, BridgeError> {
        let binding = self
            .lock()
            .get(&window)
            .and_then(|names| names.get(name))
            .cloned()
            .ok_or_else(|| BridgeError::BindingNotFound {
                window,
                name: name.to_string(),
            })?;

        match panic::catch_unwind(AssertUnwindSafe(|| binding(args))) {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(BridgeError::Rejected(message)),
            Err(panic) => {
                let message = panic_message(&*panic);
                error!(window_id = %window, name, "binding panicked: {message}");
                Err(BridgeError::Rejected(format!("binding '{name}' panicked")))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<WindowId, HashMap<String, Binding>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(f: impl Fn(&str) -> Result<String, String> + Send + Sync + 'static) -> Binding {
        Arc::new(f)
    }

    fn constant(value: &'static str) -> Binding {
        binding(move |_| Ok(value.to_string()))
    }

    #[test]
    fn rebinding_overwrites() {
        let registry = BindingRegistry::new();
        let w = WindowId(100);

        assert!(!registry.insert(w, "f", constant("h1")));
        assert!(registry.insert(w, "f", constant("h2")));

        assert_eq!(registry.invoke(w, "f", "[]").unwrap(), "h2");
        assert_eq!(registry.names(w), vec!["f".to_string()]);
    }

    #[test]
    fn unbound_name_is_not_found() {
        let registry = BindingRegistry::new();
        registry.insert(WindowId(1), "f", constant("x"));

        let err = registry.invoke(WindowId(1), "g", "[]").unwrap_err();
        assert_eq!(
            err,
            BridgeError::BindingNotFound {
                window: WindowId(1),
                name: "g".into()
            }
        );
        assert!(registry.invoke(WindowId(2), "f", "[]").is_err());
    }

    #[test]
    fn bindings_are_scoped_per_window() {
        let registry = BindingRegistry::new();
        registry.insert(WindowId(1), "f", constant("one"));
        registry.insert(WindowId(2), "f", constant("two"));

        assert_eq!(registry.invoke(WindowId(1), "f", "[]").unwrap(), "one");
        assert_eq!(registry.invoke(WindowId(2), "f", "[]").unwrap(), "two");
    }

    #[test]
    fn args_reach_the_callable() {
        let registry = BindingRegistry::new();
        registry.insert(
            WindowId(1),
            "echo",
            binding(|args| Ok(format!("got {args}"))),
        );
        assert_eq!(
            registry.invoke(WindowId(1), "echo", r#"["a",1]"#).unwrap(),
            r#"got ["a",1]"#
        );
    }

    #[test]
    fn callable_error_is_rejected() {
        let registry = BindingRegistry::new();
        registry.insert(WindowId(1), "fail", binding(|_| Err("nope".to_string())));
        assert_eq!(
            registry.invoke(WindowId(1), "fail", "[]"),
            Err(BridgeError::Rejected("nope".into()))
        );
    }

    #[test]
    fn panicking_callable_is_rejected() {
        let registry = BindingRegistry::new();
        registry.insert(WindowId(1), "boom", binding(|_| panic!("kaboom")));
        assert!(matches!(
            registry.invoke(WindowId(1), "boom", "[]"),
            Err(BridgeError::Rejected(_))
        ));
    }

    #[test]
    fn remove_window_drops_everything() {
        let registry = BindingRegistry::new();
        registry.insert(WindowId(1), "a", constant("a"));
        registry.insert(WindowId(1), "b", constant("b"));
        registry.insert(WindowId(2), "a", constant("a"));

        assert_eq!(registry.remove_window(WindowId(1)), 2);
        assert!(registry.names(WindowId(1)).is_empty());
        assert!(registry.contains(WindowId(2), "a"));
        assert_eq!(registry.remove_window(WindowId(1)), 0);
    }

    #[test]
    fn remove_single_binding() {
        let registry = BindingRegistry::new();
        registry.insert(WindowId(1), "a", constant("a"));

        assert!(registry.remove(WindowId(1), "a"));
        assert!(!registry.remove(WindowId(1), "a"));
        assert!(!registry.contains(WindowId(1), "a"));
    }

    #[test]
    fn callable_may_rebind_itself() {
        let registry = Arc::new(BindingRegistry::new());
        let inner = Arc::clone(&registry);
        registry.insert(
            WindowId(1),
            "swap",
            binding(move |_| {
                inner.insert(WindowId(1), "swap", binding(|_| Ok("swapped".into())));
                Ok("original".into())
            }),
        );

        assert_eq!(registry.invoke(WindowId(1), "swap", "[]").unwrap(), "original");
        assert_eq!(registry.invoke(WindowId(1), "swap", "[]").unwrap(), "swapped");
    }
}
