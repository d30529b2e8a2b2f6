use super::{AppState, StateError};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<AppState>, StateError>;
    async fn save(&self, state: &AppState) -> Result<(), StateError>;
}

/// One JSON file, replaced atomically on every save.
pub struct JsonFilePort {
    path: PathBuf,
}

impl JsonFilePort {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), StateError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[async_trait]
impl PersistencePort for JsonFilePort {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<AppState>, StateError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No saved state yet");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn save(&self, state: &AppState) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(state)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(|e| StateError::Task(e.to_string()))?
    }
}

/// Keeps the last saved state in memory.
#[derive(Default)]
pub struct MemoryPort {
    saved: Mutex<Option<AppState>>,
    saves: Mutex<usize>,
}

impl MemoryPort {
    pub fn with_state(state: AppState) -> Self {
        Self {
            saved: Mutex::new(Some(state)),
            saves: Mutex::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl PersistencePort for MemoryPort {
    async fn load(&self) -> Result<Option<AppState>, StateError> {
        Ok(self.saved.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    async fn save(&self, state: &AppState) -> Result<(), StateError> {
        *self.saved.lock().unwrap_or_else(|p| p.into_inner()) = Some(state.clone());
        *self.saves.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Ok(())
    }
}
