//! Global subscriber installation. Kept in its own test binary: installing
//! the process-wide subscriber would hide events from `tracing-test`
//! captures in other tests.

use tool_router::observability::{init_tracing, init_tracing_with};
use tool_router::types::ObservabilityConfig;

#[test]
fn init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    init_tracing_with(&ObservabilityConfig {
        log_level: "debug".to_string(),
        json_logs: true,
    });
    tracing::info!("subscriber installed once");
}
