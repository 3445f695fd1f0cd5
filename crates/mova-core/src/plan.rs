use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// A canonical plan document: an ordered action list plus an optional
/// JSON Schema gating the initial parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    pub mova_version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
    pub actions: Vec<ActionNode>,
}

impl Plan {
    /// Major component of `mova_version`, if it parses.
    pub fn major_version(&self) -> Option<u32> {
        self.mova_version.split('.').next()?.parse().ok()
    }
}

/// One step of a plan. `invoke` selects the action kind; the optional
/// `if`/`for_each` fields guard and repeat it; `on_success`/`on_error`
/// are continuation lists keyed off the handler's boolean outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionNode {
    pub invoke: String,
    #[serde(default = "empty_object")]
    pub payload: Value,
    #[serde(rename = "if", default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub for_each: Option<String>,
    #[serde(default)]
    pub loop_variable: Option<String>,
    #[serde(default)]
    pub on_success: Option<Vec<ActionNode>>,
    #[serde(default)]
    pub on_error: Option<Vec<ActionNode>>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Closed set of action kinds. Dispatch is an exhaustive match over this
/// enum; an unrecognized `invoke` string lands in `Unknown` and is skipped
/// with a warning rather than failing the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    ContextSet,
    FlowSwitch,
    FlowParallel,
    FlowTry,
    FlowDelay,
    FlowInvoke,
    FlowReturn,
    ConsoleLog,
    HttpRequest,
    Unknown(String),
}

impl ActionKind {
    pub fn parse(invoke: &str) -> Self {
        match invoke {
            "context:set" => ActionKind::ContextSet,
            "flow:switch" => ActionKind::FlowSwitch,
            "flow:parallel" => ActionKind::FlowParallel,
            "flow:try" => ActionKind::FlowTry,
            "flow:delay" => ActionKind::FlowDelay,
            "flow:invoke" => ActionKind::FlowInvoke,
            "flow:return" => ActionKind::FlowReturn,
            "console:log" => ActionKind::ConsoleLog,
            "http:request" => ActionKind::HttpRequest,
            other => ActionKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::ContextSet => "context:set",
            ActionKind::FlowSwitch => "flow:switch",
            ActionKind::FlowParallel => "flow:parallel",
            ActionKind::FlowTry => "flow:try",
            ActionKind::FlowDelay => "flow:delay",
            ActionKind::FlowInvoke => "flow:invoke",
            ActionKind::FlowReturn => "flow:return",
            ActionKind::ConsoleLog => "console:log",
            ActionKind::HttpRequest => "http:request",
            ActionKind::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPayload {
    pub variable: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwitchPayload {
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub cases: IndexMap<String, Vec<ActionNode>>,
    #[serde(default)]
    pub default: Option<Vec<ActionNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TryPayload {
    #[serde(rename = "try")]
    pub try_actions: Vec<ActionNode>,
    #[serde(default)]
    pub catch: Option<CatchBlock>,
    #[serde(default)]
    pub finally: Option<FinallyBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatchBlock {
    /// Context variable the error object is bound to while the catch list
    /// runs. Defaults to `error`.
    #[serde(rename = "as", default)]
    pub bind_as: Option<String>,
    pub actions: Vec<ActionNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinallyBlock {
    pub actions: Vec<ActionNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelayPayload {
    pub ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvokePayload {
    pub plan_ref: String,
    #[serde(default = "empty_object")]
    pub parameters: Value,
    #[serde(default)]
    pub result_in: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogPayload {
    #[serde(default)]
    pub message: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpPayload {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: IndexMap<String, Value>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub result_in: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_requires_actions() {
        let doc = json!({ "mova_version": "3.3" });
        let err = serde_json::from_value::<Plan>(doc).unwrap_err();
        assert!(err.to_string().contains("actions"));
    }

    #[test]
    fn test_action_defaults() {
        let doc = json!({ "mova_version": "3.3", "actions": [ { "invoke": "console:log" } ] });
        let plan: Plan = serde_json::from_value(doc).unwrap();
        let action = &plan.actions[0];
        assert_eq!(action.payload, json!({}));
        assert!(action.condition.is_none());
        assert!(action.on_success.is_none());
    }

    #[test]
    fn test_condition_field_uses_if_keyword() {
        let doc = json!({
            "mova_version": "3.3",
            "actions": [ { "invoke": "console:log", "if": "ready" } ]
        });
        let plan: Plan = serde_json::from_value(doc).unwrap();
        assert_eq!(plan.actions[0].condition.as_deref(), Some("ready"));
    }

    #[test]
    fn test_action_kind_parse() {
        assert_eq!(ActionKind::parse("flow:return"), ActionKind::FlowReturn);
        assert_eq!(ActionKind::parse("http:request"), ActionKind::HttpRequest);
        assert_eq!(
            ActionKind::parse("does:not-exist"),
            ActionKind::Unknown("does:not-exist".to_string())
        );
    }

    #[test]
    fn test_switch_payload_preserves_case_order() {
        let payload: SwitchPayload = serde_json::from_value(json!({
            "value": "{x}",
            "cases": { "b": [], "a": [], "c": [] }
        }))
        .unwrap();
        let keys: Vec<&str> = payload.cases.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn test_major_version() {
        let plan: Plan = serde_json::from_value(json!({
            "mova_version": "3.3",
            "actions": []
        }))
        .unwrap();
        assert_eq!(plan.major_version(), Some(3));
    }
}
