// Browser-side instrumentation payload

const CAPTURE_SCRIPT: &str = include_str!("../../assets/capture.js");

const EVENT_PLACEHOLDER: &str = "__DEVLOGS_EVENT__";

/// Global flag the payload sets so hot reloads do not wrap the console twice
pub const INSTALL_FLAG: &str = "__DEVLOGS_CAPTURE_INSTALLED__";

/// Module served in place of the payload when browser capture is off
pub const INERT_STUB: &str = "// devlogs: browser capture disabled\nexport {};\n";

/// Payload source forwarding events on the channel event `event`
pub fn render(event: &str) -> String {
    // A JSON string literal is also a valid JS string literal
    let literal = serde_json::to_string(event).unwrap_or_else(|_| "\"devlogs:log\"".to_string());
    CAPTURE_SCRIPT.replace(EVENT_PLACEHOLDER, &literal)
}

/// Content of the virtual module
pub fn module_source(enabled: bool, event: &str) -> String {
    if enabled {
        render(event)
    } else {
        INERT_STUB.to_string()
    }
}
