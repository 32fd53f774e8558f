//! On-disk tool store and registry loader.
//!
//! The store is a YAML list of tool records. It is read in full on every
//! load; nothing is cached between loads, so a rebuilt registry always
//! reflects the latest file contents. Writers serialize through a mutex and
//! replace the file atomically (write to a temp file, then rename), so a
//! reader never observes a torn store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::tools::generator::{ToolGenerator, ToolLookup};
use crate::tools::math::SolveQuadratic;
use crate::tools::ops::{Operation, StoredTool};
use crate::tools::search::WebSearch;
use crate::tools::{RegistryError, Tool, ToolRegistry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access tool store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tool store {path} is not valid YAML: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("tool `{0}` not found in the store")]
    ToolNotFound(String),
}

/// One persisted tool description.
///
/// `operation` replaces the source-file locator of earlier designs: the
/// record is the complete definition, nothing is imported at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    pub description: String,
    pub operation: Operation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Handle to the YAML tool store. Cheap to clone; writers are serialized.
#[derive(Clone)]
pub struct ToolStore {
    path: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl ToolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every usable record from the store.
    ///
    /// A missing file is an empty catalogue. Records missing `name` or
    /// `operation` (or otherwise unparseable) are skipped with a warning;
    /// a file that is not YAML at all is a hard error.
    pub fn records(&self) -> Result<Vec<ToolRecord>, StoreError> {
        let raw = match fs::read_to_string(self.path.as_ref()) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.as_ref().clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<serde_yaml::Value> =
            serde_yaml::from_str(&raw).map_err(|source| StoreError::Malformed {
                path: self.path.as_ref().clone(),
                source,
            })?;

        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_yaml::from_value::<ToolRecord>(entry) {
                Ok(record) if record.name.is_empty() => {
                    warn!(index, "skipping tool record with an empty name");
                }
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(index, error = %err, "skipping invalid tool record");
                }
            }
        }
        Ok(records)
    }

    /// Whether a record with this name exists.
    pub fn contains(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.records()?.iter().any(|record| record.name == name))
    }

    /// Append one record, persisting atomically.
    pub async fn append(&self, record: ToolRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.records()?;
        records.push(record);
        self.write_all(&records)
    }

    /// Seed the four basic arithmetic tools if the store does not exist yet.
    pub async fn ensure_seeded(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        if self.path.exists() {
            return Ok(());
        }
        self.write_all(&default_records())
    }

    fn write_all(&self, records: &[ToolRecord]) -> Result<(), StoreError> {
        let path = self.path.as_ref();
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let yaml = serde_yaml::to_string(records).map_err(|source| StoreError::Malformed {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)
    }
}

fn default_records() -> Vec<ToolRecord> {
    let seed = [
        (
            "addition",
            "Add two numbers. Input: 'a,b' (e.g. '4.0,5')",
            Operation::Add,
        ),
        (
            "subtraction",
            "Subtract the second number from the first. Input: 'a,b'",
            Operation::Subtract,
        ),
        (
            "multiplication",
            "Multiply two numbers. Input: 'a,b'",
            Operation::Multiply,
        ),
        (
            "division",
            "Divide the first number by the second. Input: 'a,b'",
            Operation::Divide,
        ),
    ];

    seed.into_iter()
        .map(|(name, description, operation)| ToolRecord {
            name: name.to_string(),
            description: description.to_string(),
            operation,
            created_at: None,
        })
        .collect()
}

/// Build a fresh registry: builtin tools plus every loadable store record.
///
/// Builtins register first so a store record can never shadow one. Records
/// that fail to register are logged and skipped; the loader tolerates
/// partial failure and returns whatever did load. With `filter` set, store
/// records are narrowed to that name and a miss is fatal for the call.
pub fn load_registry(
    store: &ToolStore,
    search_result_limit: usize,
    filter: Option<&str>,
) -> Result<ToolRegistry, StoreError> {
    let mut registry = ToolRegistry::new();

    let builtins: [Arc<dyn Tool>; 4] = [
        Arc::new(WebSearch::new(search_result_limit)),
        Arc::new(SolveQuadratic),
        Arc::new(ToolGenerator::new(store.clone())),
        Arc::new(ToolLookup::new(store.clone())),
    ];
    for tool in builtins {
        if let Err(RegistryError::Duplicate(name)) = registry.register(tool) {
            warn!(tool = %name, "builtin tool registered twice");
        }
    }

    let mut matched = filter.is_none();
    for record in store.records()? {
        if let Some(want) = filter {
            if record.name != want {
                continue;
            }
        }
        matched = true;

        let tool = StoredTool::new(
            record.name.clone(),
            record.description.clone(),
            record.operation,
        );
        match registry.register(Arc::new(tool)) {
            Ok(()) => debug!(tool = %record.name, "loaded stored tool"),
            Err(RegistryError::Duplicate(name)) => {
                warn!(tool = %name, "duplicate tool name in store; keeping the first definition");
            }
        }
    }

    if let Some(want) = filter {
        if !matched {
            return Err(StoreError::ToolNotFound(want.to_string()));
        }
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, ToolStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ToolStore::new(dir.path().join("tool_store.yaml"));
        (dir, store)
    }

    #[tokio::test]
    async fn seeded_store_loads_every_default_tool() {
        let (_dir, store) = temp_store();
        store.ensure_seeded().await.unwrap();

        let registry = load_registry(&store, 3, None).unwrap();
        for name in ["addition", "subtraction", "multiplication", "division"] {
            let tool = registry.get(name).unwrap();
            assert_eq!(tool.name(), name);
        }
        for name in crate::tools::BUILTIN_TOOL_NAMES {
            assert!(registry.get(name).is_some(), "missing builtin {name}");
        }
    }

    #[tokio::test]
    async fn seeding_twice_does_not_overwrite() {
        let (_dir, store) = temp_store();
        store.ensure_seeded().await.unwrap();
        store
            .append(ToolRecord {
                name: "halve".to_string(),
                description: "Halve".to_string(),
                operation: Operation::Divide,
                created_at: None,
            })
            .await
            .unwrap();

        store.ensure_seeded().await.unwrap();
        assert!(store.contains("halve").unwrap());
    }

    #[tokio::test]
    async fn loading_twice_yields_the_same_names() {
        let (_dir, store) = temp_store();
        store.ensure_seeded().await.unwrap();

        let first: Vec<String> = load_registry(&store, 3, None)
            .unwrap()
            .list()
            .into_iter()
            .map(|t| t.name)
            .collect();
        let second: Vec<String> = load_registry(&store, 3, None)
            .unwrap()
            .list()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn reload_reflects_a_changed_file() {
        let (_dir, store) = temp_store();
        store.ensure_seeded().await.unwrap();
        let before = load_registry(&store, 3, None).unwrap();
        assert!(before.get("triple").is_none());

        store
            .append(ToolRecord {
                name: "triple".to_string(),
                description: "Multiply by three. Input: 'a,3'".to_string(),
                operation: Operation::Multiply,
                created_at: None,
            })
            .await
            .unwrap();

        let after = load_registry(&store, 3, None).unwrap();
        let tool = after.get("triple").unwrap();
        assert_eq!(tool.execute("3,3").await.unwrap(), "9.0");
    }

    #[tokio::test]
    async fn invalid_records_are_skipped_not_fatal() {
        let (dir, _) = temp_store();
        let path = dir.path().join("tool_store.yaml");
        fs::write(
            &path,
            concat!(
                "- name: addition\n",
                "  description: Add two numbers\n",
                "  operation: add\n",
                "- description: record with no name\n",
                "  operation: add\n",
                "- name: broken\n",
                "  description: unknown operation\n",
                "  operation: exec\n",
            ),
        )
        .unwrap();

        let store = ToolStore::new(path);
        let records = store.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "addition");
    }

    #[test]
    fn missing_file_is_an_empty_catalogue() {
        let (_dir, store) = temp_store();
        assert!(store.records().unwrap().is_empty());
    }

    #[test]
    fn unparseable_yaml_is_a_hard_error() {
        let (dir, _) = temp_store();
        let path = dir.path().join("tool_store.yaml");
        fs::write(&path, ": not yaml [").unwrap();

        let store = ToolStore::new(path);
        assert!(matches!(
            store.records().unwrap_err(),
            StoreError::Malformed { .. }
        ));
    }

    #[tokio::test]
    async fn filter_miss_is_fatal_for_that_call() {
        let (_dir, store) = temp_store();
        store.ensure_seeded().await.unwrap();

        let err = load_registry(&store, 3, Some("no_such_tool")).unwrap_err();
        assert!(matches!(err, StoreError::ToolNotFound(name) if name == "no_such_tool"));
    }

    #[tokio::test]
    async fn filter_hit_loads_only_that_record() {
        let (_dir, store) = temp_store();
        store.ensure_seeded().await.unwrap();

        let registry = load_registry(&store, 3, Some("division")).unwrap();
        assert!(registry.get("division").is_some());
        assert!(registry.get("addition").is_none());
    }

    #[tokio::test]
    async fn append_leaves_no_temp_file_behind() {
        let (dir, store) = temp_store();
        store.ensure_seeded().await.unwrap();
        store
            .append(ToolRecord {
                name: "halve".to_string(),
                description: "Halve".to_string(),
                operation: Operation::Divide,
                created_at: None,
            })
            .await
            .unwrap();

        assert!(!dir.path().join("tool_store.yaml.tmp").exists());
        assert!(store.contains("halve").unwrap());
    }

    #[tokio::test]
    async fn duplicate_store_record_keeps_the_first_definition() {
        let (dir, _) = temp_store();
        let path = dir.path().join("tool_store.yaml");
        fs::write(
            &path,
            concat!(
                "- name: twice\n",
                "  description: first definition\n",
                "  operation: add\n",
                "- name: twice\n",
                "  description: second definition\n",
                "  operation: subtract\n",
            ),
        )
        .unwrap();

        let registry = load_registry(&ToolStore::new(path), 3, None).unwrap();
        let tool = registry.get("twice").unwrap();
        assert_eq!(tool.description(), "first definition");
    }

    #[tokio::test]
    async fn generator_roundtrip_makes_the_tool_loadable() {
        use crate::tools::generator::ToolGenerator;

        let (_dir, store) = temp_store();
        store.ensure_seeded().await.unwrap();

        let generator = ToolGenerator::new(store.clone());
        let confirmation = generator
            .execute("name: remainder | description: Remainder of a / b. Input: 'a,b' | operation: modulo")
            .await
            .unwrap();
        assert!(confirmation.contains("remainder"));

        let registry = load_registry(&store, 3, None).unwrap();
        let tool = registry.get("remainder").unwrap();
        assert_eq!(tool.execute("7,4").await.unwrap(), "3.0");
    }

    #[tokio::test]
    async fn generator_refuses_duplicate_names() {
        use crate::tools::generator::ToolGenerator;

        let (_dir, store) = temp_store();
        store.ensure_seeded().await.unwrap();

        let generator = ToolGenerator::new(store.clone());
        let err = generator
            .execute("name: addition | description: Add again | operation: add")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let err = generator
            .execute("name: web_search | description: Shadow a builtin | operation: add")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn lookup_matches_names_and_descriptions() {
        use crate::tools::generator::ToolLookup;

        let (_dir, store) = temp_store();
        store.ensure_seeded().await.unwrap();

        let lookup = ToolLookup::new(store.clone());
        let hits = lookup.execute("divide").await.unwrap();
        assert!(hits.contains("division"));

        let misses = lookup.execute("astrology").await.unwrap();
        assert!(misses.contains("No stored tools match"));
    }
}
