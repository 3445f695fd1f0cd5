use mova_core::{Context, SetPayload};

use super::HandlerOutcome;

pub(crate) fn set(payload: SetPayload, ctx: &mut Context) -> HandlerOutcome {
    ctx.set_path(&payload.variable, payload.value);
    HandlerOutcome::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_writes_nested_path() {
        let mut ctx = Context::new();
        let payload: SetPayload =
            serde_json::from_value(json!({ "variable": "vars.x", "value": 7 })).unwrap();
        assert_eq!(set(payload, &mut ctx), HandlerOutcome::Success);
        assert_eq!(ctx.get_path("vars.x"), Some(&json!(7)));
    }

    #[test]
    fn test_set_defaults_value_to_null() {
        let mut ctx = Context::new();
        let payload: SetPayload = serde_json::from_value(json!({ "variable": "x" })).unwrap();
        set(payload, &mut ctx);
        assert_eq!(ctx.get_path("x"), Some(&json!(null)));
    }
}
