//! Output helpers: the run report goes to stdout, everything else to stderr.

use serde::Serialize;

/// Render a value as pretty JSON, or a single line in `--json` mode.
pub fn render_json<T: Serialize>(value: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    rendered.unwrap_or_else(|e| format!(r#"{{"error":"failed to serialize output: {e}"}}"#))
}

pub fn print_json<T: Serialize>(value: &T, compact: bool) {
    println!("{}", render_json(value, compact));
}

/// Report a fatal error the way the caller asked for.
pub fn print_error(error: &anyhow::Error, json: bool) {
    if json {
        print_json(&serde_json::json!({ "error": format!("{error:#}") }), true);
    } else {
        eprintln!("Run failed: {error:#}");
    }
}
