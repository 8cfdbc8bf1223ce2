//! Page-side call protocol.
//!
//! Messages flow in both directions:
//! - **JS -> Rust**: a bound function posts
//!   `{"id": seq, "method": name, "params": [...]}` through the platform
//!   message channel and returns a promise parked in `window._rpc[seq]`.
//! - **Rust -> JS**: the host settles that promise by evaluating
//!   [`resolve_script`] or [`reject_script`] in the same window.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method name reserved for the native invoke entry point.
pub const NATIVE_INVOKE_METHOD: &str = "__native_invoke";

/// Global function through which pages reach the native invoke entry point.
pub const NATIVE_INVOKE_GLOBAL: &str = "nativeInvoke";

/// A call from page script to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Sequence number keying the pending promise.
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Parse a raw message posted by page script.
    pub fn from_json(raw: &str) -> Option<Self> {
        let request: Self = serde_json::from_str(raw).ok()?;
        match request.id {
            Value::Number(_) | Value::String(_) => Some(request),
            _ => None,
        }
    }

    /// The sequence id as a JS expression usable as an index.
    pub fn seq(&self) -> String {
        self.id.to_string()
    }

    pub fn is_native_invoke(&self) -> bool {
        self.method == NATIVE_INVOKE_METHOD
    }

    /// Argument payload handed to the native invoke handler: a single
    /// string argument verbatim, anything else as JSON text.
    pub fn native_payload(&self) -> String {
        match &self.params {
            Value::Null => String::new(),
            Value::Array(items) if items.is_empty() => String::new(),
            Value::Array(items) if items.len() == 1 => match &items[0] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            other => other.to_string(),
        }
    }
}

/// Script installing `window[global]` as a promise-returning function that
/// posts calls for `method`.
pub fn stub_script(global: &str, method: &str) -> String {
    let global = js_string(global);
    let method = js_string(method);
    format!(
        r#"(function() {{
  var RPC = window._rpc = (window._rpc || {{nextSeq: 1}});
  window[{global}] = function() {{
    var seq = RPC.nextSeq++;
    var promise = new Promise(function(resolve, reject) {{
      RPC[seq] = {{ resolve: resolve, reject: reject }};
    }});
    window.external.invoke(JSON.stringify({{
      id: seq,
      method: {method},
      params: Array.prototype.slice.call(arguments)
    }}));
    return promise;
  }};
}})();"#
    )
}

/// Stub for a host binding exposed under its own name.
pub fn binding_stub(name: &str) -> String {
    stub_script(name, name)
}

/// Stub for the native invoke entry point, injected into every window.
pub fn native_invoke_stub() -> String {
    stub_script(NATIVE_INVOKE_GLOBAL, NATIVE_INVOKE_METHOD)
}

/// Script removing a binding from the page.
pub fn unbind_script(name: &str) -> String {
    format!("delete window[{}];", js_string(name))
}

/// Settle a pending call successfully. `result` must be a JSON value.
pub fn resolve_script(seq: &str, result: &str) -> String {
    format!("window._rpc[{seq}].resolve({result}); delete window._rpc[{seq}];")
}

/// Settle a pending call with an error message.
pub fn reject_script(seq: &str, message: &str) -> String {
    format!(
        "window._rpc[{seq}].reject({}); delete window._rpc[{seq}];",
        js_string(message)
    )
}

/// Pass JSON results through untouched; wrap anything else as a string.
pub fn encode_result(raw: &str) -> String {
    if serde_json::from_str::<Value>(raw).is_ok() {
        raw.to_string()
    } else {
        js_string(raw)
    }
}

/// Quote a string as a JSON (and therefore JS) string literal.
pub fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_binding_call() {
        let req = RpcRequest::from_json(r#"{"id":3,"method":"hello","params":[1,"two"]}"#).unwrap();
        assert_eq!(req.seq(), "3");
        assert_eq!(req.method, "hello");
        assert_eq!(req.params, serde_json::json!([1, "two"]));
        assert!(!req.is_native_invoke());
    }

    #[test]
    fn missing_params_default_to_null() {
        let req = RpcRequest::from_json(r#"{"id":"7","method":"openPopup"}"#).unwrap();
        assert_eq!(req.seq(), "\"7\"");
        assert!(req.params.is_null());
    }

    #[test]
    fn rejects_malformed_messages() {
        assert!(RpcRequest::from_json("not json").is_none());
        assert!(RpcRequest::from_json(r#"{"method":"x"}"#).is_none());
        assert!(RpcRequest::from_json(r#"{"id":null,"method":"x"}"#).is_none());
        assert!(RpcRequest::from_json(r#"{"id":1}"#).is_none());
    }

    #[test]
    fn native_payload_unwraps_single_string() {
        let req = RpcRequest::from_json(r#"{"id":1,"method":"__native_invoke","params":["X"]}"#)
            .unwrap();
        assert!(req.is_native_invoke());
        assert_eq!(req.native_payload(), "X");
    }

    #[test]
    fn native_payload_serializes_other_shapes() {
        let req = RpcRequest::from_json(
            r#"{"id":1,"method":"__native_invoke","params":[{"a":1},2]}"#,
        )
        .unwrap();
        assert_eq!(req.native_payload(), r#"[{"a":1},2]"#);

        let req = RpcRequest::from_json(r#"{"id":1,"method":"__native_invoke","params":[]}"#)
            .unwrap();
        assert_eq!(req.native_payload(), "");

        let req = RpcRequest::from_json(r#"{"id":1,"method":"__native_invoke","params":[42]}"#)
            .unwrap();
        assert_eq!(req.native_payload(), "42");
    }

    #[test]
    fn binding_stub_escapes_name() {
        let js = binding_stub("hello");
        assert!(js.contains(r#"window["hello"] = function()"#));
        assert!(js.contains(r#"method: "hello""#));

        let js = binding_stub("it's");
        assert!(js.contains(r#"window["it's"]"#));
    }

    #[test]
    fn native_stub_uses_reserved_method() {
        let js = native_invoke_stub();
        assert!(js.contains(r#"window["nativeInvoke"]"#));
        assert!(js.contains(r#"method: "__native_invoke""#));
    }

    #[test]
    fn settle_scripts() {
        assert_eq!(
            resolve_script("4", "\"ok\""),
            r#"window._rpc[4].resolve("ok"); delete window._rpc[4];"#
        );
        assert_eq!(
            reject_script("4", "bad \"input\""),
            r#"window._rpc[4].reject("bad \"input\""); delete window._rpc[4];"#
        );
        assert_eq!(unbind_script("hello"), r#"delete window["hello"];"#);
    }

    #[test]
    fn encode_result_keeps_json() {
        assert_eq!(encode_result("42"), "42");
        assert_eq!(encode_result(r#"{"a":[1]}"#), r#"{"a":[1]}"#);
        assert_eq!(encode_result("processed X"), "\"processed X\"");
        assert_eq!(encode_result(""), "\"\"");
    }
}
