use std::sync::Arc;

use tether_common::{BridgeError, WindowId};
use tracing::{debug, warn};

use super::{canonical, Inner, WindowManager};
use crate::bindings::Binding;
use crate::rpc::{self, RpcRequest, NATIVE_INVOKE_GLOBAL, NATIVE_INVOKE_METHOD};

// =============================================================================
// HOST BINDINGS
// =============================================================================

impl WindowManager {
    /// Expose `f` to script in window `id` as a promise-returning
    /// `window[name]`. Binding a name again replaces the callable.
    pub fn bind<F>(&self, id: WindowId, name: &str, f: F) -> Result<(), BridgeError>
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        let id = canonical(id);
        let name = binding_name(name)?;
        let binding: Binding = Arc::new(f);
        self.on_ui(move |inner| inner.bind(id, &name, binding))
    }

    pub async fn bind_async<F>(&self, id: WindowId, name: &str, f: F) -> Result<(), BridgeError>
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        let id = canonical(id);
        let name = binding_name(name)?;
        let binding: Binding = Arc::new(f);
        self.on_ui_async(move |inner| inner.bind(id, &name, binding))
            .await
    }

    /// Remove a binding from window `id` and from its page.
    pub fn unbind(&self, id: WindowId, name: &str) -> Result<(), BridgeError> {
        let id = canonical(id);
        let name = name.to_string();
        self.on_ui(move |inner| inner.unbind(id, &name))
    }

    /// Call a binding directly with JSON-encoded arguments. Runs on the
    /// calling thread.
    pub fn invoke(&self, id: WindowId, name: &str, args: &str) -> Result<String, BridgeError> {
        let id = canonical(id);
        if !self.inner.windows.contains(id) {
            return Err(BridgeError::WindowNotFound(id));
        }
        self.inner.bindings.invoke(id, name, args)
    }

    // =========================================================================
    // NATIVE INVOKE
    // =========================================================================

    /// Install the process-wide native invoke handler, replacing any
    /// previous one.
    pub fn register_native_handler<F>(&self, handler: F)
    where
        F: Fn(WindowId, &str) -> (bool, String) + Send + Sync + 'static,
    {
        self.inner.native.register_handler(handler);
    }

    /// Route a native invoke call. Without a handler this yields
    /// `(false, "")`.
    pub fn dispatch_native(&self, id: WindowId, payload: &str) -> (bool, String) {
        self.inner.native.dispatch(id, payload)
    }

    // =========================================================================
    // INBOUND SCRIPT MESSAGES
    // =========================================================================

    /// Handle a message posted by page script in window `id`.
    ///
    /// The call runs on the current thread; its promise is settled later
    /// on the UI thread. Messages that are not calls are dropped.
    pub fn handle_script_message(&self, id: WindowId, raw: &str) {
        let id = canonical(id);
        let Some(request) = RpcRequest::from_json(raw) else {
            warn!(
                window_id = %id,
                body_len = raw.len(),
                "script message rejected: not a call"
            );
            return;
        };
        debug!(window_id = %id, method = %request.method, "script call");

        let outcome = if request.is_native_invoke() {
            match self.inner.native.dispatch(id, &request.native_payload()) {
                (true, payload) => Ok(rpc::js_string(&payload)),
                (false, payload) => Err(payload),
            }
        } else {
            let args = if request.params.is_null() {
                "[]".to_string()
            } else {
                request.params.to_string()
            };
            match self.invoke(id, &request.method, &args) {
                Ok(result) => Ok(rpc::encode_result(&result)),
                Err(BridgeError::Rejected(message)) => Err(message),
                Err(e) => {
                    warn!(window_id = %id, method = %request.method, "script call failed: {e}");
                    Err(e.to_string())
                }
            }
        };

        let seq = request.seq();
        let script = match outcome {
            Ok(value) => rpc::resolve_script(&seq, &value),
            Err(message) => rpc::reject_script(&seq, &message),
        };
        self.settle(id, script);
    }

    /// Evaluate a promise-settling script on the UI thread. Dropped if the
    /// window is gone by then.
    fn settle(&self, id: WindowId, script: String) {
        let inner = Arc::clone(&self.inner);
        let posted = self.inner.ui.post(move || {
            if let Err(e) = inner.with_window(id, |backend, state| backend.eval(state.id, &script)) {
                debug!(window_id = %id, "call result dropped: {e}");
            }
        });
        if let Err(e) = posted {
            debug!(window_id = %id, "call result dropped: {e}");
        }
    }
}

impl Inner {
    fn bind(&self, id: WindowId, name: &str, binding: Binding) -> Result<(), BridgeError> {
        self.windows.with_window_mut(id, |_| {
            if !self.bindings.contains(id, name) {
                let stub = rpc::binding_stub(name);
                let mut backend = self.backend();
                backend
                    .add_init_script(id, &stub)
                    .and_then(|()| backend.eval(id, &stub))
                    .map_err(|e| BridgeError::BindFailed(e.to_string()))?;
            }
            self.bindings.insert(id, name, binding);
            Ok(())
        })
    }

    fn unbind(&self, id: WindowId, name: &str) -> Result<(), BridgeError> {
        self.windows.with_window_mut(id, |_| {
            if !self.bindings.remove(id, name) {
                return Err(BridgeError::BindingNotFound {
                    window: id,
                    name: name.to_string(),
                });
            }
            let script = rpc::unbind_script(name);
            let mut backend = self.backend();
            if let Err(e) = backend
                .add_init_script(id, &script)
                .and_then(|()| backend.eval(id, &script))
            {
                warn!(window_id = %id, name, "binding removed from host only: {e}");
            }
            Ok(())
        })
    }
}

fn binding_name(name: &str) -> Result<String, BridgeError> {
    if name.is_empty() || name == NATIVE_INVOKE_GLOBAL || name == NATIVE_INVOKE_METHOD {
        return Err(BridgeError::BindFailed(format!(
            "'{name}' cannot be used as a binding name"
        )));
    }
    Ok(name.to_string())
}
