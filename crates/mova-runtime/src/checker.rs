use indexmap::IndexMap;
use mova_core::{ActionKind, ActionNode, Plan, SwitchPayload, TryPayload};
use serde_json::Value;

/// Structural lint for a plan document, used by `mova check`. Flags unknown
/// invoke keys and control-flow payloads that do not deserialize, walking
/// nested action lists. Leaf payloads are not checked here: interpolation
/// can legally rewrite them at runtime (a payload may even be a single
/// placeholder string), so only shapes that hold action lists are static.
pub fn check_plan(plan: &Plan) -> Vec<String> {
    let mut problems = Vec::new();
    if plan.major_version() != Some(3) {
        problems.push(format!("unsupported mova_version '{}'", plan.mova_version));
    }
    check_actions(&plan.actions, "actions", &mut problems);
    problems
}

fn check_actions(actions: &[ActionNode], at: &str, problems: &mut Vec<String>) {
    for (idx, node) in actions.iter().enumerate() {
        check_node(node, &format!("{at}[{idx}]"), problems);
    }
}

fn check_node(node: &ActionNode, at: &str, problems: &mut Vec<String>) {
    match ActionKind::parse(&node.invoke) {
        ActionKind::Unknown(name) => {
            problems.push(format!("{at}: unknown invoke key '{name}'"));
        }
        ActionKind::FlowSwitch => {
            match serde_json::from_value::<SwitchPayload>(node.payload.clone()) {
                Ok(payload) => {
                    for (name, actions) in &payload.cases {
                        check_actions(actions, &format!("{at}.cases.{name}"), problems);
                    }
                    if let Some(actions) = &payload.default {
                        check_actions(actions, &format!("{at}.default"), problems);
                    }
                }
                Err(e) => problems.push(format!("{at}: invalid flow:switch payload: {e}")),
            }
        }
        ActionKind::FlowParallel => {
            match serde_json::from_value::<IndexMap<String, Vec<ActionNode>>>(node.payload.clone())
            {
                Ok(branches) => {
                    for (name, actions) in &branches {
                        check_actions(actions, &format!("{at}.{name}"), problems);
                    }
                }
                Err(e) => problems.push(format!("{at}: invalid flow:parallel payload: {e}")),
            }
        }
        ActionKind::FlowTry => match serde_json::from_value::<TryPayload>(node.payload.clone()) {
            Ok(payload) => {
                check_actions(&payload.try_actions, &format!("{at}.try"), problems);
                if let Some(catch) = &payload.catch {
                    check_actions(&catch.actions, &format!("{at}.catch"), problems);
                }
                if let Some(finally) = &payload.finally {
                    check_actions(&finally.actions, &format!("{at}.finally"), problems);
                }
            }
            Err(e) => problems.push(format!("{at}: invalid flow:try payload: {e}")),
        },
        ActionKind::FlowInvoke => {
            if !matches!(node.payload.get("plan_ref"), Some(Value::String(_))) {
                problems.push(format!("{at}: flow:invoke payload needs a string plan_ref"));
            }
        }
        ActionKind::ContextSet => {
            if node.payload.is_object() && node.payload.get("variable").is_none() {
                problems.push(format!("{at}: context:set payload needs a variable"));
            }
        }
        ActionKind::FlowDelay
        | ActionKind::FlowReturn
        | ActionKind::ConsoleLog
        | ActionKind::HttpRequest => {}
    }

    if let Some(list) = &node.on_success {
        check_actions(list, &format!("{at}.on_success"), problems);
    }
    if let Some(list) = &node.on_error {
        check_actions(list, &format!("{at}.on_error"), problems);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(doc: Value) -> Plan {
        serde_json::from_value(doc).unwrap()
    }

    #[test]
    fn test_clean_plan_has_no_problems() {
        let p = plan(json!({
            "mova_version": "3.3",
            "actions": [
                { "invoke": "context:set", "payload": { "variable": "x", "value": 1 } },
                { "invoke": "console:log", "payload": { "message": "{x}" } }
            ]
        }));
        assert!(check_plan(&p).is_empty());
    }

    #[test]
    fn test_unknown_invoke_is_flagged_with_location() {
        let p = plan(json!({
            "mova_version": "3.3",
            "actions": [
                {
                    "invoke": "flow:switch",
                    "payload": {
                        "value": "x",
                        "cases": { "a": [ { "invoke": "nope:nope" } ] }
                    }
                }
            ]
        }));
        let problems = check_plan(&p);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("actions[0].cases.a[0]"));
    }

    #[test]
    fn test_malformed_try_payload_is_flagged() {
        let p = plan(json!({
            "mova_version": "3.3",
            "actions": [ { "invoke": "flow:try", "payload": { "catch": {} } } ]
        }));
        let problems = check_plan(&p);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("flow:try"));
    }

    #[test]
    fn test_invoke_without_plan_ref_is_flagged() {
        let p = plan(json!({
            "mova_version": "3.3",
            "actions": [ { "invoke": "flow:invoke", "payload": {} } ]
        }));
        assert_eq!(check_plan(&p).len(), 1);
    }

    #[test]
    fn test_unsupported_version_is_flagged() {
        let p = plan(json!({ "mova_version": "2.0", "actions": [] }));
        assert_eq!(check_plan(&p).len(), 1);
    }
}
