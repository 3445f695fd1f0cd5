use mova_core::Context;
use serde_json::Value;

use crate::interpolate::resolve_path;

/// Evaluates an `if` guard against the context. Guards are either a single
/// comparison (`n > 1`, `status == "done"`) or a bare operand checked for
/// truthiness. Operands are dot-paths into the context or JSON literals.
/// Truthiness follows the original engine's JavaScript semantics: absent,
/// `null`, `false`, `0` and `""` are falsy, everything else is truthy.
pub(crate) fn evaluate(guard: &str, ctx: &Context) -> bool {
    let guard = guard.trim();
    if guard.is_empty() {
        return true;
    }

    for (symbol, op) in OPERATORS {
        if let Some(idx) = guard.find(symbol) {
            let lhs = operand(guard[..idx].trim(), ctx);
            let rhs = operand(guard[idx + symbol.len()..].trim(), ctx);
            return compare(*op, lhs.as_ref(), rhs.as_ref());
        }
    }

    truthy(operand(guard, ctx).as_ref())
}

#[derive(Clone, Copy)]
enum Op {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

// Two-character symbols first so `>=` is not split as `>` + `=`.
const OPERATORS: &[(&str, Op)] = &[
    ("==", Op::Eq),
    ("!=", Op::Ne),
    (">=", Op::Ge),
    ("<=", Op::Le),
    (">", Op::Gt),
    ("<", Op::Lt),
];

fn operand(text: &str, ctx: &Context) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    if let Ok(literal) = serde_json::from_str::<Value>(text) {
        return Some(literal);
    }
    resolve_path(text, ctx)
}

fn compare(op: Op, lhs: Option<&Value>, rhs: Option<&Value>) -> bool {
    match op {
        Op::Eq => equals(lhs, rhs),
        Op::Ne => !equals(lhs, rhs),
        Op::Gt | Op::Lt | Op::Ge | Op::Le => {
            let (Some(a), Some(b)) = (lhs.and_then(Value::as_f64), rhs.and_then(Value::as_f64))
            else {
                return false;
            };
            match op {
                Op::Gt => a > b,
                Op::Lt => a < b,
                Op::Ge => a >= b,
                Op::Le => a <= b,
                _ => unreachable!(),
            }
        }
    }
}

fn equals(lhs: Option<&Value>, rhs: Option<&Value>) -> bool {
    match (lhs, rhs) {
        (Some(a), Some(b)) => {
            // cross-representation numbers (1 vs 1.0) compare equal
            if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
                return x == y;
            }
            a == b
        }
        (None, None) => true,
        _ => false,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
