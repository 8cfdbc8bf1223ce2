//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r#"# Tether Configuration
# Only override what you want to change -- missing fields use defaults.

[window]
# title = "Tether"
# width = 480
# height = 320
# hint = "none"          # none | min | max | fixed
# url = "http://localhost:3030/webview.html"
# debug = false

[bridge]
# first_child_id = 100   # ids handed to child windows start here
# call_timeout_ms = 5000 # how long worker threads wait on the ui thread
# close_main_with_last_child = false

[logging]
# level = "info"         # trace | debug | info | warn | error
"#
    .to_string()
}
