//! Rendering of results and failures.
//!
//! stdout only ever carries the JSON result; everything else goes to stderr.

use converge_control::{ReconcileError, ReconcileOutcome};
use serde_json::{json, Value};

/// Exit code for failures that are not reconciliation errors.
const GENERIC_FAILURE: u8 = 1;

/// The JSON document printed after a successful `apply`.
pub fn outcome(outcome: &ReconcileOutcome) -> Value {
    json!({
        "changed": outcome.result.changed,
        "uri": outcome.uri,
        "state": outcome.state,
        "meta": outcome.result.meta,
    })
}

/// Exit code for a top-level error.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ReconcileError>()
        .and_then(|e| u8::try_from(e.exit_code()).ok())
        .unwrap_or(GENERIC_FAILURE)
}

/// Print an error and any orchestrator context to stderr.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("error: {err:#}");

    if let Some(ReconcileError::Transport {
        response, request, ..
    }) = err.downcast_ref::<ReconcileError>()
    {
        if !is_empty(response) {
            eprintln!("response: {}", pretty(response));
        }
        if let Some(request) = request {
            eprintln!("request: {}", pretty(request));
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
