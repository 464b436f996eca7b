use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::models::{Item, State, StoredItem};
use crate::utils::error::{AppError, Result};
use crate::utils::write_atomic;

/// The single JSON snapshot of last-seen items per brand.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the previous snapshot. Never fails: a missing, unreadable or
    /// malformed file yields an empty state, so every brand seeds.
    pub fn load(&self) -> State {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}, starting empty", self.path.display());
                return State::new();
            }
            Err(e) => {
                warn!("Cannot read state file {}: {}", self.path.display(), e);
                return State::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, Vec<StoredItem>>>(&raw) {
            Ok(stored) => stored
                .into_iter()
                .map(|(brand, rows)| (brand, rows.into_iter().map(Item::from).collect()))
                .collect(),
            Err(e) => {
                warn!("Ignoring malformed state file {}: {}", self.path.display(), e);
                State::new()
            }
        }
    }

    /// Replace the snapshot on disk.
    pub fn save(&self, state: &State) -> Result<()> {
        let json = render_state(state)?;
        write_atomic(&self.path, json.as_bytes())
            .map_err(|e| AppError::StateIo(format!("{}: {}", self.path.display(), e)))
    }
}

fn render_state(state: &State) -> Result<String> {
    let mut json = serde_json::to_string_pretty(state)?;
    json.push('\n');
    Ok(json)
}
