//! Headless run of the main window / popup scenario.
//!
//! The main window exposes `openPopup`. Each popup is resized on open and
//! gets a background task that periodically rebinds `counter`. Every window
//! can reach the native invoke handler. Page calls are simulated by feeding
//! script messages to the coordinator.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tether_common::{SizeHint, TetherError, WindowId};
use tether_config::TetherConfig;
use tether_webview::{HeadlessBackend, UiLoop, WindowHandle, WindowManager};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Popup size applied by the open observer.
const POPUP_SIZE: (u32, u32) = (1024, 768);

/// Demo knobs that come from the command line.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub child_url: String,
    pub ticks: u32,
    pub tick_interval: Duration,
}

type Tasks = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Run the scenario. The calling thread becomes the UI thread.
pub fn run(config: TetherConfig, options: DemoOptions) -> Result<(), TetherError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let (ui_loop, ui) = UiLoop::new(Duration::from_millis(config.bridge.call_timeout_ms));
    let backend = HeadlessBackend::new();
    let manager = WindowManager::new(backend.clone(), ui, config.bridge.clone());
    let tasks: Tasks = Arc::new(Mutex::new(Vec::new()));

    install_observers(&manager, runtime.handle().clone(), Arc::clone(&tasks), &options);
    install_native_handler(&manager);

    let driver = {
        let manager = manager.clone();
        let runtime = runtime.handle().clone();
        thread::Builder::new()
            .name("tether-driver".into())
            .spawn(move || {
                let result = scenario(&manager, &config, &options, &backend, &tasks, &runtime);
                if let Err(e) = &result {
                    warn!("scenario failed: {e}");
                    manager.ui().quit();
                }
                result
            })?
    };

    info!("Entering ui loop");
    ui_loop.run();

    let result = driver
        .join()
        .map_err(|_| TetherError::Other("driver thread panicked".into()))?;
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

fn install_observers(manager: &WindowManager, runtime: Handle, tasks: Tasks, options: &DemoOptions) {
    let ticks = options.ticks;
    let interval = options.tick_interval;

    manager.on_window_opened(move |id, handle| {
        info!(window_id = %id, "opened");
        if id.is_main() {
            return;
        }

        let (width, height) = POPUP_SIZE;
        if let Err(e) = handle.set_size(width, height, SizeHint::None) {
            warn!(window_id = %id, "popup resize failed: {e}");
        }

        let task = runtime.spawn(rebind_counter(handle.clone(), ticks, interval));
        tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
    });

    manager.on_window_closed(|id| {
        info!(window_id = %id, "closed");
    });
}

fn install_native_handler(manager: &WindowManager) {
    manager.register_native_handler(|id, payload| {
        info!(window_id = %id, payload, "native invoke");
        if payload.is_empty() {
            (false, "empty payload".to_string())
        } else {
            (true, format!("processed {payload}"))
        }
    });
}

/// Rebind `counter` in a popup every `interval`, `ticks` times, until the
/// popup goes away.
async fn rebind_counter(handle: WindowHandle, ticks: u32, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    for tick in 1..=ticks {
        ticker.tick().await;

        if let Err(e) = handle
            .bind_async("counter", move |_| Ok(tick.to_string()))
            .await
        {
            debug!(window_id = %handle.id(), "stopping counter: {e}");
            return;
        }
        if let Err(e) = handle
            .eval_async(&format!("document.title = 'tick {tick}';"))
            .await
        {
            debug!(window_id = %handle.id(), "stopping counter: {e}");
            return;
        }
        debug!(window_id = %handle.id(), tick, "counter rebound");
    }
}

/// Drive the windows from a plain thread. Every coordinator call here
/// blocks until the UI thread has run it.
fn scenario(
    manager: &WindowManager,
    config: &TetherConfig,
    options: &DemoOptions,
    backend: &HeadlessBackend,
    tasks: &Tasks,
    runtime: &Handle,
) -> Result<(), TetherError> {
    let main = manager.open_main(config.window.clone())?;

    let popups = manager.clone();
    let child_url = options.child_url.clone();
    main.bind("openPopup", move |_| {
        popups
            .open(WindowId::MAIN, &child_url)
            .map(|id| id.as_i32().to_string())
            .map_err(|e| e.to_string())
    })?;

    // The main page clicks its "open popup" button.
    manager.handle_script_message(WindowId::MAIN, r#"{"id":1,"method":"openPopup","params":[]}"#);
    let popup = manager
        .windows()
        .child_ids()
        .into_iter()
        .next()
        .ok_or_else(|| TetherError::Other("popup did not open".into()))?;

    // The popup talks to the host through the native entry point.
    manager.handle_script_message(
        popup,
        r#"{"id":1,"method":"__native_invoke","params":["hello from popup"]}"#,
    );

    let pending: Vec<JoinHandle<()>> = tasks
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .drain(..)
        .collect();
    for task in pending {
        if let Err(e) = runtime.block_on(task) {
            warn!("counter task failed: {e}");
        }
    }

    manager.handle_script_message(popup, r#"{"id":2,"method":"counter","params":[]}"#);

    let state = manager.state(popup)?;
    info!(
        window_id = %popup,
        width = state.size.width,
        height = state.size.height,
        url = %state.url,
        "popup state"
    );
    // Settling scripts are queued behind this call.
    manager.ui().call(|| ())?;
    for script in backend.evaluated(popup) {
        debug!(window_id = %popup, "evaluated: {script}");
    }

    // The user closes the popup, then the app shuts down.
    manager.handle_window_closed(popup)?;
    manager.shutdown()?;
    Ok(())
}
