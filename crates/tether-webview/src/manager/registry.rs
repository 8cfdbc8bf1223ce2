use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tether_common::{BridgeError, WindowId, WindowState};
use tracing::debug;

/// Table of live windows keyed by id.
///
/// Entries are created and removed only by the coordinator, on the UI
/// thread. Lookups are safe from any thread.
pub struct WindowRegistry {
    state: Mutex<RegistryState>,
}

struct RegistryState {
    windows: BTreeMap<WindowId, WindowState>,
    first_child_id: i32,
    next_child_id: i32,
}

impl WindowRegistry {
    pub(crate) fn new(first_child_id: i32) -> Self {
        let first_child_id = first_child_id.max(1);
        Self {
            state: Mutex::new(RegistryState {
                windows: BTreeMap::new(),
                first_child_id,
                next_child_id: first_child_id,
            }),
        }
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.lock().windows.contains_key(&id)
    }

    pub fn count(&self) -> usize {
        self.lock().windows.len()
    }

    /// Live window ids, ascending. The main window sorts first.
    pub fn ids(&self) -> Vec<WindowId> {
        self.lock().windows.keys().copied().collect()
    }

    /// Live child window ids, ascending.
    pub fn child_ids(&self) -> Vec<WindowId> {
        self.lock()
            .windows
            .keys()
            .copied()
            .filter(|id| !id.is_main())
            .collect()
    }

    pub fn state(&self, id: WindowId) -> Option<WindowState> {
        self.lock().windows.get(&id).cloned()
    }

    /// Hand out the next child id that is not currently live.
    pub(crate) fn allocate_id(&self) -> WindowId {
        let mut state = self.lock();
        loop {
            let candidate = WindowId(state.next_child_id);
            state.next_child_id = state
                .next_child_id
                .checked_add(1)
                .unwrap_or(state.first_child_id);
            if !state.windows.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Create and insert a window while holding the registry lock, so no
    /// other entry can claim `id` in between.
    pub(crate) fn insert_with<F>(&self, id: WindowId, create: F) -> Result<(), BridgeError>
    where
        F: FnOnce() -> Result<WindowState, BridgeError>,
    {
        let mut state = self.lock();
        if state.windows.contains_key(&id) {
            return Err(BridgeError::WindowIdInUse(id));
        }
        let window = create()?;
        state.windows.insert(id, window);
        debug!(window_id = %id, live = state.windows.len(), "window registered");
        Ok(())
    }

    /// Run `op` against a live window with the registry lock held.
    pub(crate) fn with_window_mut<R, F>(&self, id: WindowId, op: F) -> Result<R, BridgeError>
    where
        F: FnOnce(&mut WindowState) -> Result<R, BridgeError>,
    {
        let mut state = self.lock();
        let window = state
            .windows
            .get_mut(&id)
            .ok_or(BridgeError::WindowNotFound(id))?;
        op(window)
    }

    /// Remove a window once `release` succeeds. A failed release keeps
    /// the entry.
    pub(crate) fn remove_with<F>(&self, id: WindowId, release: F) -> Result<WindowState, BridgeError>
    where
        F: FnOnce(&WindowState) -> Result<(), BridgeError>,
    {
        let mut state = self.lock();
        let window = state
            .windows
            .get(&id)
            .ok_or(BridgeError::WindowNotFound(id))?;
        release(window)?;
        let removed = state
            .windows
            .remove(&id)
            .ok_or(BridgeError::WindowNotFound(id))?;
        debug!(window_id = %id, live = state.windows.len(), "window unregistered");
        Ok(removed)
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_common::PlatformError;

    fn insert(registry: &WindowRegistry, id: WindowId) -> Result<(), BridgeError> {
        registry.insert_with(id, || Ok(WindowState::new(id, None, "about:blank")))
    }

    #[test]
    fn allocation_starts_at_first_child_id() {
        let registry = WindowRegistry::new(100);
        assert_eq!(registry.allocate_id(), WindowId(100));
        assert_eq!(registry.allocate_id(), WindowId(101));
    }

    #[test]
    fn allocation_skips_live_ids() {
        let registry = WindowRegistry::new(1);
        insert(&registry, WindowId(1)).unwrap();
        insert(&registry, WindowId(2)).unwrap();
        assert_eq!(registry.allocate_id(), WindowId(3));
    }

    #[test]
    fn non_positive_first_child_id_is_clamped() {
        let registry = WindowRegistry::new(-5);
        assert_eq!(registry.allocate_id(), WindowId(1));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let registry = WindowRegistry::new(1);
        insert(&registry, WindowId(7)).unwrap();
        assert_eq!(
            insert(&registry, WindowId(7)),
            Err(BridgeError::WindowIdInUse(WindowId(7)))
        );
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn failed_create_leaves_no_entry() {
        let registry = WindowRegistry::new(1);
        let result = registry.insert_with(WindowId(3), || {
            Err(PlatformError::CreateFailed("no display".into()).into())
        });
        assert!(result.is_err());
        assert!(!registry.contains(WindowId(3)));
    }

    #[test]
    fn failed_release_keeps_entry() {
        let registry = WindowRegistry::new(1);
        insert(&registry, WindowId(3)).unwrap();

        let result = registry.remove_with(WindowId(3), |_| {
            Err(PlatformError::DestroyFailed("busy".into()).into())
        });
        assert!(result.is_err());
        assert!(registry.contains(WindowId(3)));

        let removed = registry.remove_with(WindowId(3), |_| Ok(())).unwrap();
        assert_eq!(removed.id, WindowId(3));
        assert!(!registry.contains(WindowId(3)));
    }

    #[test]
    fn missing_window_is_not_found() {
        let registry = WindowRegistry::new(1);
        assert_eq!(
            registry.with_window_mut(WindowId(9), |_| Ok(())),
            Err(BridgeError::WindowNotFound(WindowId(9)))
        );
        assert!(registry.remove_with(WindowId(9), |_| Ok(())).is_err());
    }

    #[test]
    fn child_ids_exclude_main() {
        let registry = WindowRegistry::new(1);
        insert(&registry, WindowId::MAIN).unwrap();
        insert(&registry, WindowId(4)).unwrap();
        insert(&registry, WindowId(2)).unwrap();

        assert_eq!(registry.ids(), vec![WindowId::MAIN, WindowId(2), WindowId(4)]);
        assert_eq!(registry.child_ids(), vec![WindowId(2), WindowId(4)]);
    }
}
