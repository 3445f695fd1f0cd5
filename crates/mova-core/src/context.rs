use serde_json::{Map, Value};

/// The mutable variable bag for one plan execution. Variables are addressed
/// by dot-separated paths for both reads and writes, so `vars.slack` reads
/// back exactly what a `result_in: "vars.slack"` write produced. Key order
/// is preserved (serde_json is built with `preserve_order`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(vars: Map<String, Value>) -> Self {
        Self { vars }
    }

    /// Dot-path read. A missing intermediate segment or a non-object in the
    /// middle of the path means absence; this never errors.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.vars.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Dot-path write. Intermediate segments are created as objects; a
    /// non-object in the way is replaced.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop().expect("split always yields one segment");

        let mut current = &mut self.vars;
        for segment in segments {
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = slot.as_object_mut().expect("slot was just made an object");
        }
        current.insert(last.to_string(), value);
    }

    /// Dot-path removal; returns the removed value, if any.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop()?;

        let mut current = &mut self.vars;
        for segment in segments {
            current = current.get_mut(segment)?.as_object_mut()?;
        }
        current.remove(last)
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.vars.clone()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.vars
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.vars)
    }

    /// Fold one parallel branch's final state back into this context.
    /// `base` is the snapshot both sides forked from: entries the branch
    /// left untouched are skipped, entries it changed or added are applied
    /// (recursively for objects, so disjoint nested writes from different
    /// branches both survive), and keys it removed are removed. Calling
    /// this once per branch in declaration order makes the later branch
    /// win conflicting paths.
    pub fn merge_branch(&mut self, base: &Map<String, Value>, branch: Map<String, Value>) {
        merge_diff(&mut self.vars, base, branch);
    }
}

fn merge_diff(current: &mut Map<String, Value>, base: &Map<String, Value>, branch: Map<String, Value>) {
    for key in base.keys() {
        if !branch.contains_key(key) {
            current.remove(key);
        }
    }

    for (key, new_value) in branch {
        match base.get(&key) {
            Some(old_value) if *old_value == new_value => {}
            Some(Value::Object(old_obj)) => match new_value {
                Value::Object(new_obj) => {
                    if let Some(Value::Object(cur_obj)) = current.get_mut(&key) {
                        merge_diff(cur_obj, old_obj, new_obj);
                    } else {
                        current.insert(key, Value::Object(new_obj));
                    }
                }
                other => {
                    current.insert(key, other);
                }
            },
            _ => {
                current.insert(key, new_value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> Context {
        match value {
            Value::Object(map) => Context::from_map(map),
            _ => panic!("test context must be an object"),
        }
    }

    #[test]
    fn test_get_path_nested() {
        let c = ctx(json!({ "a": { "b": 5 } }));
        assert_eq!(c.get_path("a.b"), Some(&json!(5)));
        assert_eq!(c.get_path("a.missing"), None);
        assert_eq!(c.get_path("a.b.c"), None);
    }

    #[test]
    fn test_set_path_creates_intermediates() {
        let mut c = Context::new();
        c.set_path("vars.slack", json!({ "status": 200 }));
        assert_eq!(c.get_path("vars.slack.status"), Some(&json!(200)));
    }

    #[test]
    fn test_set_path_replaces_scalar_in_the_way() {
        let mut c = ctx(json!({ "vars": 1 }));
        c.set_path("vars.x", json!(true));
        assert_eq!(c.get_path("vars.x"), Some(&json!(true)));
    }

    #[test]
    fn test_remove_path() {
        let mut c = ctx(json!({ "a": { "b": 1, "c": 2 } }));
        assert_eq!(c.remove_path("a.b"), Some(json!(1)));
        assert_eq!(c.get_path("a.b"), None);
        assert_eq!(c.get_path("a.c"), Some(&json!(2)));
    }

    #[test]
    fn test_merge_later_branch_wins_conflicts() {
        let mut parent = ctx(json!({ "n": 0 }));
        let base = parent.snapshot();

        let mut a = parent.clone();
        a.set_path("n", json!(1));
        a.set_path("only_a", json!("a"));

        let mut b = parent.clone();
        b.set_path("n", json!(2));

        parent.merge_branch(&base, a.into_map());
        parent.merge_branch(&base, b.into_map());

        assert_eq!(parent.get_path("n"), Some(&json!(2)));
        assert_eq!(parent.get_path("only_a"), Some(&json!("a")));
    }

    #[test]
    fn test_merge_disjoint_nested_writes_both_survive() {
        let mut parent = ctx(json!({ "vars": {} }));
        let base = parent.snapshot();

        let mut a = parent.clone();
        a.set_path("vars.x", json!(1));
        let mut b = parent.clone();
        b.set_path("vars.y", json!(2));

        parent.merge_branch(&base, a.into_map());
        parent.merge_branch(&base, b.into_map());

        assert_eq!(parent.get_path("vars.x"), Some(&json!(1)));
        assert_eq!(parent.get_path("vars.y"), Some(&json!(2)));
    }

    #[test]
    fn test_merge_removed_key_is_removed() {
        let mut parent = ctx(json!({ "tmp": 1, "keep": 2 }));
        let base = parent.snapshot();

        let mut a = parent.clone();
        a.remove_path("tmp");

        parent.merge_branch(&base, a.into_map());
        assert_eq!(parent.get_path("tmp"), None);
        assert_eq!(parent.get_path("keep"), Some(&json!(2)));
    }
}
