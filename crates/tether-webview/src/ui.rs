//! UI-thread task queue.
//!
//! Every platform window call must happen on one thread. `UiLoop` owns the
//! receiving end of a task queue and runs on that thread; `UiHandle` is the
//! cloneable sending end. A call made on the UI thread itself runs inline,
//! anything else is queued and the caller waits for the result.
//!
//! The queue is a std channel, so the loop may run on a thread that is
//! inside a tokio runtime context.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use tether_common::BridgeError;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::lifecycle::panic_message;

/// Default wait for a blocking [`UiHandle::call`] from another thread.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

type Task = Box<dyn FnOnce() + Send + 'static>;

enum UiMessage {
    Run(Task),
    Quit,
}

struct UiShared {
    /// Thread allowed to run tasks inline.
    owner: Mutex<ThreadId>,
    closed: AtomicBool,
}

impl UiShared {
    fn is_owner(&self) -> bool {
        let owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        *owner == thread::current().id()
    }
}

/// Receiving end of the UI task queue. Run it on the UI thread.
pub struct UiLoop {
    receiver: Receiver<UiMessage>,
    shared: Arc<UiShared>,
}

/// Cloneable handle used to marshal work onto the UI thread.
#[derive(Clone)]
pub struct UiHandle {
    sender: Sender<UiMessage>,
    shared: Arc<UiShared>,
    timeout: Duration,
}

impl UiLoop {
    /// Create a loop owned by the current thread.
    ///
    /// `timeout` bounds how long [`UiHandle::call`] waits when invoked
    /// from another thread.
    pub fn new(timeout: Duration) -> (UiLoop, UiHandle) {
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(UiShared {
            owner: Mutex::new(thread::current().id()),
            closed: AtomicBool::new(false),
        });
        let handle = UiHandle {
            sender,
            shared: Arc::clone(&shared),
            timeout,
        };
        (UiLoop { receiver, shared }, handle)
    }

    /// Run tasks until [`UiHandle::quit`] is called. The calling thread
    /// becomes the UI thread.
    pub fn run(mut self) {
        self.claim_current_thread();
        debug!("ui loop running");
        while let Ok(message) = self.receiver.recv() {
            match message {
                UiMessage::Run(task) => run_task(task),
                UiMessage::Quit => break,
            }
        }
        self.close();
        debug!("ui loop stopped");
    }

    /// Run every task queued so far without blocking and return how many
    /// ran. A pending quit closes the loop.
    pub fn run_pending(&mut self) -> usize {
        self.claim_current_thread();
        let mut ran = 0;
        while let Ok(message) = self.receiver.try_recv() {
            match message {
                UiMessage::Run(task) => {
                    run_task(task);
                    ran += 1;
                }
                UiMessage::Quit => {
                    self.close();
                    break;
                }
            }
        }
        ran
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    fn claim_current_thread(&self) {
        let mut owner = self
            .shared
            .owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *owner = thread::current().id();
    }

    /// Refuse new work and drop anything still queued; waiting callers
    /// see `UiThreadGone`.
    fn close(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        while self.receiver.try_recv().is_ok() {}
    }
}

impl Drop for UiLoop {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }
}

fn run_task(task: Task) {
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(task)) {
        error!("ui task panicked: {}", panic_message(&*panic));
    }
}

impl UiHandle {
    /// Whether the current thread is the UI thread.
    pub fn is_ui_thread(&self) -> bool {
        self.shared.is_owner()
    }

    /// Whether the loop has stopped accepting work.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `f` on the UI thread and wait for its result.
    ///
    /// Runs inline when already on the UI thread. Otherwise the task is
    /// queued and the caller blocks for at most the configured timeout;
    /// a timed-out task still runs later, its result is discarded.
    pub fn call<R, F>(&self, f: F) -> Result<R, BridgeError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_closed() {
            return Err(BridgeError::UiThreadGone);
        }
        if self.is_ui_thread() {
            return Ok(f());
        }

        let (tx, rx) = mpsc::sync_channel(1);
        self.enqueue(Box::new(move || {
            let _ = tx.send(f());
        }))?;

        match rx.recv_timeout(self.timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "ui call timed out"
                );
                Err(BridgeError::DispatchTimeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::UiThreadGone),
        }
    }

    /// Async variant of [`call`](Self::call) for callers running on an
    /// async runtime. Never times out.
    pub async fn call_async<R, F>(&self, f: F) -> Result<R, BridgeError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_closed() {
            return Err(BridgeError::UiThreadGone);
        }
        if self.is_ui_thread() {
            return Ok(f());
        }

        let (tx, rx) = oneshot::channel();
        self.enqueue(Box::new(move || {
            let _ = tx.send(f());
        }))?;
        rx.await.map_err(|_| BridgeError::UiThreadGone)
    }

    /// Queue `f` to run on the UI thread later, even when called from the
    /// UI thread.
    pub fn post<F>(&self, f: F) -> Result<(), BridgeError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_closed() {
            return Err(BridgeError::UiThreadGone);
        }
        self.enqueue(Box::new(f))
    }

    /// Ask the loop to stop after the tasks queued before this call.
    pub fn quit(&self) {
        let _ = self.sender.send(UiMessage::Quit);
    }

    fn enqueue(&self, task: Task) -> Result<(), BridgeError> {
        self.sender
            .send(UiMessage::Run(task))
            .map_err(|_| BridgeError::UiThreadGone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn call_on_owner_thread_runs_inline() {
        let (_ui_loop, ui) = UiLoop::new(DEFAULT_CALL_TIMEOUT);
        assert!(ui.is_ui_thread());
        assert_eq!(ui.call(|| 2 + 2).unwrap(), 4);
    }

    #[test]
    fn call_from_worker_runs_on_ui_thread() {
        let (ui_loop, ui) = UiLoop::new(DEFAULT_CALL_TIMEOUT);
        let ui_thread = thread::current().id();

        let worker = {
            let ui = ui.clone();
            thread::spawn(move || {
                assert!(!ui.is_ui_thread());
                let seen = ui.call(|| thread::current().id()).unwrap();
                ui.quit();
                seen
            })
        };

        ui_loop.run();
        assert_eq!(worker.join().unwrap(), ui_thread);
    }

    #[test]
    fn tasks_from_one_caller_run_in_order() {
        let (ui_loop, ui) = UiLoop::new(DEFAULT_CALL_TIMEOUT);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let worker = {
            let ui = ui.clone();
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                for i in 0..20 {
                    let seen = Arc::clone(&seen);
                    ui.post(move || seen.lock().unwrap().push(i)).unwrap();
                }
                ui.quit();
            })
        };

        ui_loop.run();
        worker.join().unwrap();
        assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn calls_after_quit_fail() {
        let (ui_loop, ui) = UiLoop::new(DEFAULT_CALL_TIMEOUT);
        ui.quit();
        ui_loop.run();

        assert!(ui.is_closed());
        assert_eq!(ui.call(|| 1), Err(BridgeError::UiThreadGone));
        assert_eq!(ui.post(|| {}), Err(BridgeError::UiThreadGone));
    }

    #[test]
    fn blocked_ui_thread_times_out() {
        let (ui_loop, ui) = UiLoop::new(Duration::from_millis(50));

        let result = thread::spawn(move || ui.call(|| 1)).join().unwrap();
        assert_eq!(result, Err(BridgeError::DispatchTimeout));
        drop(ui_loop);
    }

    #[test]
    fn dropped_loop_reports_gone() {
        let (ui_loop, ui) = UiLoop::new(DEFAULT_CALL_TIMEOUT);
        drop(ui_loop);

        let result = thread::spawn(move || ui.call(|| 1)).join().unwrap();
        assert_eq!(result, Err(BridgeError::UiThreadGone));
    }

    #[test]
    fn run_pending_drains_queue() {
        let (mut ui_loop, ui) = UiLoop::new(DEFAULT_CALL_TIMEOUT);
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let count = Arc::clone(&count);
            ui.post(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        assert_eq!(ui_loop.run_pending(), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(ui_loop.run_pending(), 0);
        assert!(!ui_loop.is_closed());
    }

    #[test]
    fn run_pending_honours_quit() {
        let (mut ui_loop, ui) = UiLoop::new(DEFAULT_CALL_TIMEOUT);
        ui.post(|| {}).unwrap();
        ui.quit();
        ui.post(|| {}).unwrap();

        assert_eq!(ui_loop.run_pending(), 1);
        assert!(ui_loop.is_closed());
        assert!(ui.is_closed());
    }

    #[test]
    fn panicking_task_does_not_stop_loop() {
        let (ui_loop, ui) = UiLoop::new(DEFAULT_CALL_TIMEOUT);
        let ran = Arc::new(AtomicBool::new(false));

        ui.post(|| panic!("boom")).unwrap();
        {
            let ran = Arc::clone(&ran);
            ui.post(move || ran.store(true, Ordering::SeqCst)).unwrap();
        }
        ui.quit();

        ui_loop.run();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn call_async_marshals_to_ui_thread() {
        let (tx, rx) = mpsc::channel();
        let ui_thread = thread::spawn(move || {
            let (ui_loop, ui) = UiLoop::new(DEFAULT_CALL_TIMEOUT);
            tx.send(ui).unwrap();
            ui_loop.run();
        });
        let ui = rx.recv().unwrap();

        let here = thread::current().id();
        let seen = ui.call_async(|| thread::current().id()).await.unwrap();
        assert_ne!(seen, here);

        ui.quit();
        ui_thread.join().unwrap();
        assert_eq!(ui.call_async(|| 1).await, Err(BridgeError::UiThreadGone));
    }

    #[tokio::test]
    async fn loop_runs_inside_an_async_context() {
        let (ui_loop, ui) = UiLoop::new(DEFAULT_CALL_TIMEOUT);
        let worker = {
            let ui = ui.clone();
            thread::spawn(move || {
                let value = ui.call(|| 7);
                ui.quit();
                value
            })
        };

        ui_loop.run();
        assert_eq!(worker.join().unwrap(), Ok(7));
    }
}
