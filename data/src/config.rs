use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Theme;

const STATE_FILE: &str = "state.json";

/// Viewer state persisted between sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    pub selected_theme: Theme,
    pub window_size: Option<(f32, f32)>,
    pub last_trace: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Reads the saved state, falling back to defaults on any error. A
/// missing or unreadable state file is expected on first launch and
/// never fatal.
pub fn load() -> State {
    match read() {
        Ok(state) => state,
        Err(err) => {
            log::warn!("no saved state ({err}), starting with defaults");
            State::default()
        }
    }
}

fn read() -> Result<State, Error> {
    let contents = fs::read_to_string(crate::data_path(STATE_FILE))?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn save(state: &State) -> Result<(), Error> {
    fs::write(path()?, serde_json::to_string_pretty(state)?)?;
    Ok(())
}

fn path() -> Result<PathBuf, Error> {
    let full_path = crate::data_path(STATE_FILE);

    let parent = full_path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid state file path"))?;

    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    Ok(full_path)
}
