use mova_core::Context;
use serde_json::Value;

/// Resolves `{path.to.value}` placeholders in an arbitrary JSON value
/// against the context. A string that is exactly one placeholder takes the
/// raw context value, preserving its type; placeholders mixed with other
/// text are stringified in place. Arrays and objects are walked recursively
/// with key order preserved. Resolution never fails: an unresolved
/// placeholder is left as literal text.
pub fn interpolate(value: &Value, ctx: &Context) -> Value {
    match value {
        Value::String(s) => interpolate_string(s, ctx),
        Value::Array(items) => Value::Array(items.iter().map(|v| interpolate(v, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Dot-path lookup used by interpolation and condition guards. Context
/// variables shadow everything; an absent `env.NAME` path falls back to the
/// process environment so plans can reference `{env.SLACK_BOT_TOKEN}`
/// without the environment being copied into the context.
pub(crate) fn resolve_path(path: &str, ctx: &Context) -> Option<Value> {
    if let Some(value) = ctx.get_path(path) {
        return Some(value.clone());
    }
    let name = path.strip_prefix("env.")?;
    std::env::var(name).ok().map(Value::String)
}

fn interpolate_string(s: &str, ctx: &Context) -> Value {
    if let Some(path) = exact_placeholder(s) {
        return match resolve_path(path, ctx) {
            Some(value) => value,
            None => Value::String(s.to_string()),
        };
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match tail[1..].find(['{', '}']) {
            // well-formed `{path}` occurrence
            Some(idx) if tail.as_bytes()[1 + idx] == b'}' => {
                let path = &tail[1..1 + idx];
                match resolve_path(path, ctx) {
                    Some(value) => out.push_str(&stringify(&value)),
                    None => {
                        out.push('{');
                        out.push_str(path);
                        out.push('}');
                    }
                }
                rest = &tail[idx + 2..];
            }
            // nested `{` or unterminated brace: emit the `{` and move on
            _ => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Value::String(out)
}

fn exact_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() || inner.contains('{') || inner.contains('}') {
        return None;
    }
    Some(inner)
}

/// In-text substitution form: strings verbatim, containers as compact JSON.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
