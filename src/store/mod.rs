pub mod json_store;
pub mod paper_cache;
pub mod schema;

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use crate::store::schema::AppStateData;

/// Load/save boundary for the persisted state record.
pub trait StateStore: Send {
    /// `Ok(None)` when nothing has been saved yet.
    fn load_state(&self) -> Result<Option<AppStateData>>;
    fn save_state(&self, state: &AppStateData) -> Result<()>;

    /// Move an unusable saved record out of the way so that the next save
    /// starts a new one instead of overwriting it.
    fn set_aside(&self) -> Result<()> {
        Ok(())
    }
}

/// Volatile store for tests and for runs without a writable data directory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    state: Option<AppStateData>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AppStateData) -> Self {
        let store = Self::default();
        if let Ok(mut inner) = store.inner.lock() {
            inner.state = Some(state);
        }
        store
    }

    pub fn snapshot(&self) -> Option<AppStateData> {
        self.inner.lock().ok().and_then(|inner| inner.state.clone())
    }

    pub fn save_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.saves).unwrap_or(0)
    }

    /// Make every later save fail, to exercise error paths.
    pub fn fail_saves(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_saves = fail;
        }
    }
}

impl StateStore for MemoryStore {
    fn load_state(&self) -> Result<Option<AppStateData>> {
        let inner = self.inner.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(inner.state.clone())
    }

    fn save_state(&self, state: &AppStateData) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        if inner.fail_saves {
            return Err(anyhow!("save rejected"));
        }
        inner.state = Some(state.clone());
        inner.saves += 1;
        Ok(())
    }
}
