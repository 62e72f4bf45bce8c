use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::Serialize;

use crate::config::Config;
use crate::store::StateStore;
use crate::store::schema::{AppStateData, EXPORT_VERSION, ExportData};

const STATE_FILE: &str = "state.json";

pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examdr");
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Write through a temp file and rename so a crash never leaves a torn file.
    fn write_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Backups never carry the API key.
    pub fn export_all(&self, config: &Config, state: &AppStateData) -> ExportData {
        let mut config = config.clone();
        config.api_key = None;
        ExportData {
            examdr_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            config,
            state: state.clone(),
        }
    }

    pub fn export_to(&self, path: &Path, data: &ExportData) -> Result<()> {
        Self::write_atomic(path, data)
            .with_context(|| format!("Export to {} failed", path.display()))
    }

    pub fn read_export(path: &Path) -> Result<ExportData> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let data: ExportData = serde_json::from_str(&content)
            .with_context(|| format!("{} is not an examdr export", path.display()))?;
        Ok(data)
    }

    /// Replace the saved state with an export's. The version is checked
    /// before anything is written.
    pub fn import_all(&self, data: &ExportData) -> Result<()> {
        if data.examdr_export_version != EXPORT_VERSION {
            bail!(
                "Unsupported export version: {} (expected {})",
                data.examdr_export_version,
                EXPORT_VERSION
            );
        }
        if data.state.needs_reset() {
            bail!(
                "Unsupported state schema version: {}",
                data.state.schema_version
            );
        }
        self.save_state(&data.state)
            .context("Import failed while writing state")
    }
}

impl StateStore for JsonStore {
    fn load_state(&self) -> Result<Option<AppStateData>> {
        let path = self.file_path(STATE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let state = serde_json::from_str(&content)
            .with_context(|| format!("{} is unreadable", path.display()))?;
        Ok(Some(state))
    }

    fn save_state(&self, state: &AppStateData) -> Result<()> {
        Self::write_atomic(&self.file_path(STATE_FILE), state)
    }

    /// Renames `state.json` to `state.json.bak-<timestamp>`.
    fn set_aside(&self) -> Result<()> {
        let path = self.file_path(STATE_FILE);
        if !path.exists() {
            return Ok(());
        }
        let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
        let backup = self.file_path(&format!("{STATE_FILE}.bak-{stamp}"));
        fs::rename(&path, &backup).with_context(|| {
            format!("Cannot move {} to {}", path.display(), backup.display())
        })?;
        tracing::warn!(backup = %backup.display(), "unreadable progress file set aside");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::model::User;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_first_run_has_no_state() {
        let (_dir, store) = make_test_store();
        assert!(store.load_state().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = make_test_store();
        let mut state = AppStateData::default();
        state.user = Some(User {
            id: "u9".to_string(),
            username: "李同学".to_string(),
            email: "li@example.com".to_string(),
        });
        store.save_state(&state).unwrap();

        let loaded = store.load_state().unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(!store.file_path("state.tmp").exists(), "temp file renamed away");
    }

    #[test]
    fn test_corrupt_state_is_an_error() {
        let (_dir, store) = make_test_store();
        fs::write(store.file_path(STATE_FILE), "{not json").unwrap();
        let err = store.load_state().unwrap_err();
        assert!(err.to_string().contains("unreadable"));
    }

    #[test]
    fn test_set_aside_keeps_original_bytes() {
        let (dir, store) = make_test_store();
        fs::write(store.file_path(STATE_FILE), "\"broken\"").unwrap();
        store.set_aside().unwrap();

        assert!(!store.file_path(STATE_FILE).exists());
        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("state.json.bak-")
            })
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(backups[0].path()).unwrap(), "\"broken\"");
    }

    #[test]
    fn test_set_aside_without_state_is_a_no_op() {
        let (_dir, store) = make_test_store();
        store.set_aside().unwrap();
        assert!(store.load_state().unwrap().is_none());
    }

    #[test]
    fn test_export_then_import_into_fresh_store() {
        let (dir, store) = make_test_store();
        let config = Config::default();
        let state = AppStateData::default();
        let export = store.export_all(&config, &state);
        let path = dir.path().join("backup.json");
        store.export_to(&path, &export).unwrap();

        let (_dir2, store2) = make_test_store();
        let read = JsonStore::read_export(&path).unwrap();
        store2.import_all(&read).unwrap();
        assert_eq!(store2.load_state().unwrap().unwrap(), state);
    }

    #[test]
    fn test_export_omits_api_key() {
        let (_dir, store) = make_test_store();
        let config = Config {
            api_key: Some("secret".to_string()),
            ..Config::default()
        };
        let export = store.export_all(&config, &AppStateData::default());
        assert!(export.config.api_key.is_none());
        assert_eq!(export.config.paper_model, config.paper_model);
    }

    #[test]
    fn test_version_rejection() {
        let (_dir, store) = make_test_store();
        let mut export = store.export_all(&Config::default(), &AppStateData::default());
        export.examdr_export_version = 99;

        let result = store.import_all(&export);
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Unsupported export version"));
        assert!(err_msg.contains("99"));
        assert!(store.load_state().unwrap().is_none(), "nothing written");
    }

    #[test]
    fn test_read_export_rejects_foreign_json() {
        let (dir, _store) = make_test_store();
        let path = dir.path().join("other.json");
        fs::write(&path, r#"{"hello": "world"}"#).unwrap();
        assert!(JsonStore::read_export(&path).is_err());
    }
}
