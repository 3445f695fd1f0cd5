use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use mova_core::{EngineError, Plan, Result};
use tokio::sync::RwLock;

/// A loaded manifest: logical plan names mapped to storage paths relative
/// to the manifest file's directory.
#[derive(Debug)]
pub struct Manifest {
    base_dir: PathBuf,
    entries: HashMap<String, String>,
}

impl Manifest {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.entries.get(name).map(|rel| self.base_dir.join(rel))
    }
}

static MANIFEST_CACHE: OnceLock<RwLock<HashMap<String, Arc<Manifest>>>> = OnceLock::new();

fn manifest_cache() -> &'static RwLock<HashMap<String, Arc<Manifest>>> {
    MANIFEST_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Loads plan documents and resolves sub-plan references through a manifest
/// registry. The manifest is read lazily on the first `flow:invoke` and
/// cached for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct PlanLoader {
    manifest_path: Option<PathBuf>,
}

impl PlanLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(mut self, path: impl AsRef<Path>) -> Self {
        self.manifest_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub async fn load_plan(&self, path: &Path) -> Result<Plan> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EngineError::Io {
                path: path.to_string_lossy().to_string(),
                message: e.to_string(),
            })?;

        let plan: Plan = serde_json::from_str(&source).map_err(|e| EngineError::InvalidPlan {
            path: path.to_string_lossy().to_string(),
            message: e.to_string(),
        })?;

        if plan.major_version() != Some(3) {
            tracing::warn!(
                path = %path.display(),
                version = %plan.mova_version,
                "plan declares an unsupported mova_version, executing anyway"
            );
        }

        Ok(plan)
    }

    /// Resolves a logical plan name to a storage path. `Ok(None)` means the
    /// name is unknown (or no manifest is configured); the caller treats
    /// that as a non-fatal failure. A missing or malformed manifest file is
    /// an error.
    pub async fn resolve(&self, plan_ref: &str) -> Result<Option<PathBuf>> {
        let Some(manifest_path) = &self.manifest_path else {
            return Ok(None);
        };
        let manifest = self.load_manifest(manifest_path).await?;
        Ok(manifest.resolve(plan_ref))
    }

    async fn load_manifest(&self, path: &Path) -> Result<Arc<Manifest>> {
        let key = std::fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .to_string();

        let cache = manifest_cache();
        {
            let cache_read = cache.read().await;
            if let Some(manifest) = cache_read.get(&key) {
                return Ok(manifest.clone());
            }
        }

        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EngineError::Manifest {
                path: path.to_string_lossy().to_string(),
                message: e.to_string(),
            })?;

        let entries: HashMap<String, String> =
            serde_json::from_str(&source).map_err(|e| EngineError::Manifest {
                path: path.to_string_lossy().to_string(),
                message: e.to_string(),
            })?;

        let manifest = Arc::new(Manifest {
            base_dir: path.parent().map(PathBuf::from).unwrap_or_default(),
            entries,
        });

        {
            let mut cache_write = cache.write().await;
            cache_write.insert(key, manifest.clone());
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "plan.json",
            r#"{ "mova_version": "3.3", "actions": [ { "invoke": "console:log" } ] }"#,
        );

        let plan = PlanLoader::new().load_plan(&path).await.unwrap();
        assert_eq!(plan.actions.len(), 1);
    }

    #[tokio::test]
    async fn test_load_plan_without_actions_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "plan.json", r#"{ "mova_version": "3.3" }"#);

        let err = PlanLoader::new().load_plan(&path).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidPlan { .. }));
    }

    #[tokio::test]
    async fn test_resolve_through_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_file(dir.path(), "manifest.json", r#"{ "child": "plans/child.json" }"#);

        let loader = PlanLoader::new().with_manifest(&manifest);
        let resolved = loader.resolve("child").await.unwrap().unwrap();
        assert_eq!(resolved, dir.path().join("plans/child.json"));
        assert!(loader.resolve("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_without_manifest_is_none() {
        let loader = PlanLoader::new();
        assert!(loader.resolve("anything").await.unwrap().is_none());
    }
}
