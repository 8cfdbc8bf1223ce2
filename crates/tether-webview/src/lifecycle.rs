//! Window open/close notifications.
//!
//! Observers run synchronously, in registration order, with no coordinator
//! lock held. A panicking observer is logged and skipped; the others still
//! run and the window operation that fired the event is unaffected.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use tether_common::{EventBus, WindowEvent, WindowId};
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::manager::WindowHandle;

pub type OpenObserver = Arc<dyn Fn(WindowId, &WindowHandle) + Send + Sync>;
pub type CloseObserver = Arc<dyn Fn(WindowId) + Send + Sync>;

const EVENT_BUS_CAPACITY: usize = 64;

pub struct LifecycleDispatcher {
    open: RwLock<Vec<OpenObserver>>,
    close: RwLock<Vec<CloseObserver>>,
    bus: EventBus,
}

impl LifecycleDispatcher {
    pub fn new() -> Self {
        Self {
            open: RwLock::new(Vec::new()),
            close: RwLock::new(Vec::new()),
            bus: EventBus::new(EVENT_BUS_CAPACITY),
        }
    }

    /// Observe every window open, main window included (its id is `<= 0`).
    pub fn on_open<F>(&self, observer: F)
    where
        F: Fn(WindowId, &WindowHandle) + Send + Sync + 'static,
    {
        self.open
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    /// Observe every window close, main window included.
    pub fn on_close<F>(&self, observer: F)
    where
        F: Fn(WindowId) + Send + Sync + 'static,
    {
        self.close
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    /// Receive lifecycle events asynchronously.
    pub fn subscribe(&self) -> broadcast::Receiver<WindowEvent> {
        self.bus.subscribe()
    }

    pub fn notify_open(&self, id: WindowId, handle: &WindowHandle) {
        let observers = self
            .open
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        debug!(window_id = %id, observers = observers.len(), "notify open");

        for (index, observer) in observers.iter().enumerate() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| observer(id, handle)));
            if let Err(panic) = result {
                error!(
                    window_id = %id,
                    index,
                    "open observer panicked: {}",
                    panic_message(&*panic)
                );
            }
        }
        self.bus.publish(WindowEvent::Opened(id));
    }

    pub fn notify_close(&self, id: WindowId) {
        let observers = self
            .close
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        debug!(window_id = %id, observers = observers.len(), "notify close");

        for (index, observer) in observers.iter().enumerate() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| observer(id)));
            if let Err(panic) = result {
                error!(
                    window_id = %id,
                    index,
                    "close observer panicked: {}",
                    panic_message(&*panic)
                );
            }
        }
        self.bus.publish(WindowEvent::Closed(id));
    }

    pub(crate) fn publish_shutdown(&self) {
        self.bus.publish(WindowEvent::Shutdown);
    }
}

impl Default for LifecycleDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn close_observers_run_in_registration_order() {
        let dispatcher = LifecycleDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            dispatcher.on_close(move |id| seen.lock().unwrap().push((tag, id)));
        }

        dispatcher.notify_close(WindowId(100));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("first", WindowId(100)),
                ("second", WindowId(100)),
                ("third", WindowId(100)),
            ]
        );
    }

    #[test]
    fn panicking_observer_does_not_stop_the_rest() {
        let dispatcher = LifecycleDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        {
            let seen = Arc::clone(&seen);
            dispatcher.on_close(move |id| seen.lock().unwrap().push(id));
        }
        dispatcher.on_close(|_| panic!("observer failed"));
        {
            let seen = Arc::clone(&seen);
            dispatcher.on_close(move |id| seen.lock().unwrap().push(id));
        }

        dispatcher.notify_close(WindowId::MAIN);
        assert_eq!(*seen.lock().unwrap(), vec![WindowId::MAIN, WindowId::MAIN]);
    }

    #[test]
    fn observer_may_register_another_observer() {
        let dispatcher = Arc::new(LifecycleDispatcher::new());
        let count = Arc::new(Mutex::new(0));

        {
            let inner = Arc::clone(&dispatcher);
            let count = Arc::clone(&count);
            dispatcher.on_close(move |_| {
                let count = Arc::clone(&count);
                inner.on_close(move |_| *count.lock().unwrap() += 1);
            });
        }

        dispatcher.notify_close(WindowId(1));
        assert_eq!(*count.lock().unwrap(), 0);
        dispatcher.notify_close(WindowId(2));
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn close_is_published_on_the_bus() {
        let dispatcher = LifecycleDispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.notify_close(WindowId(5));
        dispatcher.publish_shutdown();

        assert_eq!(rx.recv().await.unwrap(), WindowEvent::Closed(WindowId(5)));
        assert_eq!(rx.recv().await.unwrap(), WindowEvent::Shutdown);
    }

    #[test]
    fn panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*payload), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
