//! Saved sign-in, persisted to disk.
//!
//! The session file is stored at `~/.config/deezer-api/session.json`:
//!
//! ```json
//! { "user": { "arl": "...", "id": 123456, "username": "...", "email": "..." } }
//! ```
//!
//! The ARL is a long-lived account credential. Pass the saved
//! [`UserInfo`] to [`MobileClient::with_user_info`](crate::MobileClient::with_user_info)
//! and call `restore_session` instead of signing in again.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DeezerError, Result};
use crate::types::UserInfo;

/// Persistent sign-in backed by a JSON file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<UserInfo>,
}

impl Session {
    /// Load from the default path. Missing file means an empty session.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save to the default path, creating parent directories if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Delete the session file.
    pub fn clear() -> Result<()> {
        let path = Self::path()?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    pub fn is_signed_in(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| !u.arl.is_empty() && u.id != 0)
    }

    fn path() -> Result<PathBuf> {
        let config = dirs::config_dir()
            .ok_or_else(|| DeezerError::Other("cannot determine config directory".into()))?;
        Ok(config.join("deezer-api").join("session.json"))
    }
}
