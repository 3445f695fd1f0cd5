pub(crate) mod console;
pub(crate) mod context;
pub(crate) mod http;

use serde_json::Value;

/// What one dispatched action yielded, before its `on_success`/`on_error`
/// continuations are applied. Boolean outcomes never bubble past the action
/// that produced them; `Return` unwinds the whole invocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HandlerOutcome {
    Success,
    Failure,
    Return(Value),
}
