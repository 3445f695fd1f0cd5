use std::path::{Path, PathBuf};

use mova_core::{EngineError, Result};
use mova_runtime::{check_plan, Engine, PlanLoader};
use serde_json::{Map, Value};

pub async fn run_plan(
    plan_path: &Path,
    params: &[String],
    params_json: Option<&str>,
    manifest: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let loader = match manifest.map(Path::to_path_buf).or_else(|| default_manifest(plan_path)) {
        Some(path) => PlanLoader::new().with_manifest(path),
        None => PlanLoader::new(),
    };

    let plan = loader.load_plan(plan_path).await?;
    let params = build_params(params, params_json)?;

    let engine = Engine::new(loader).with_dry_run(dry_run);
    let result = engine.execute(&plan, params).await?;

    let rendered = serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
    println!("{rendered}");
    Ok(())
}

pub async fn check_plans(plans: &[PathBuf]) -> Result<()> {
    let loader = PlanLoader::new();
    let mut failures = 0usize;

    for path in plans {
        match loader.load_plan(path).await {
            Ok(plan) => {
                let problems = check_plan(&plan);
                if problems.is_empty() {
                    println!("{}: OK", path.display());
                } else {
                    failures += 1;
                    println!("{}: {} problem(s)", path.display(), problems.len());
                    for problem in &problems {
                        println!("  {problem}");
                    }
                }
            }
            Err(e) => {
                failures += 1;
                println!("{}: {e}", path.display());
            }
        }
    }

    if failures > 0 {
        return Err(EngineError::InvalidPlan {
            path: format!("{failures} of {} file(s)", plans.len()),
            message: "structural check failed".to_string(),
        });
    }
    Ok(())
}

/// A `manifest.json` sitting next to the plan is picked up automatically so
/// `flow:invoke` works without flags in a plans directory.
fn default_manifest(plan_path: &Path) -> Option<PathBuf> {
    let candidate = plan_path.parent()?.join("manifest.json");
    candidate.exists().then_some(candidate)
}

fn build_params(pairs: &[String], params_json: Option<&str>) -> Result<Map<String, Value>> {
    let mut params = match params_json {
        Some(source) => parse_params_json(source)?,
        None => Map::new(),
    };

    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(EngineError::ParameterValidation {
                violations: vec![format!("--param '{pair}' is not KEY=VALUE")],
            });
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        params.insert(key.to_string(), value);
    }

    Ok(params)
}

fn parse_params_json(source: &str) -> Result<Map<String, Value>> {
    let text = if Path::new(source).exists() {
        std::fs::read_to_string(source).map_err(|e| EngineError::Io {
            path: source.to_string(),
            message: e.to_string(),
        })?
    } else {
        source.to_string()
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(EngineError::ParameterValidation {
            violations: vec!["--params-json must be a JSON object".to_string()],
        }),
        Err(e) => Err(EngineError::ParameterValidation {
            violations: vec![format!("--params-json: {e}")],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_values_parse_as_json_when_possible() {
        let params = build_params(
            &["count=3".to_string(), "flag=true".to_string(), "name=mova".to_string()],
            None,
        )
        .unwrap();
        assert_eq!(params["count"], json!(3));
        assert_eq!(params["flag"], json!(true));
        assert_eq!(params["name"], json!("mova"));
    }

    #[test]
    fn test_param_overrides_params_json() {
        let params = build_params(&["n=2".to_string()], Some(r#"{ "n": 1, "keep": true }"#)).unwrap();
        assert_eq!(params["n"], json!(2));
        assert_eq!(params["keep"], json!(true));
    }

    #[test]
    fn test_param_without_equals_is_rejected() {
        assert!(build_params(&["oops".to_string()], None).is_err());
    }

    #[test]
    fn test_params_json_must_be_an_object() {
        assert!(build_params(&[], Some("[1, 2]")).is_err());
    }
}
