//! Session persistence: the store kept on disk between invocations.
//!
//! Each `cuemark` invocation loads the session, runs one command against
//! its store and writes it back if the command finished. A missing session
//! file starts an empty timeline.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cuemark_timeline::{MarkerTrack, TimelineStore};

use crate::config::TimelineConfig;
use crate::error::CliError;

/// The store of one timeline plus bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// When the session was last written.
    pub saved_at: DateTime<Utc>,
    /// Templates, instances, markers and the frame cursor.
    pub store: TimelineStore<MarkerTrack>,
}

impl Session {
    /// An empty session with the cursor at `start_frame`.
    pub fn new(timeline: &TimelineConfig) -> Self {
        let mut store = TimelineStore::new(MarkerTrack::new());
        store.set_fps(timeline.fps);
        store.set_current_frame(timeline.start_frame);
        Self {
            saved_at: Utc::now(),
            store,
        }
    }

    /// Load the session at `path`, or start a new one if the file does not
    /// exist. The configured frame rate always applies.
    pub fn load(path: &Path, timeline: &TimelineConfig) -> Result<Self, CliError> {
        if !path.exists() {
            info!(path = %path.display(), "no session file, starting a new timeline");
            return Ok(Self::new(timeline));
        }

        let text = fs::read_to_string(path).map_err(|source| CliError::SessionIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut session: Self =
            serde_json::from_str(&text).map_err(|source| CliError::SessionFormat {
                path: path.to_path_buf(),
                source,
            })?;
        session.store.set_fps(timeline.fps);
        debug!(
            path = %path.display(),
            saved_at = %session.saved_at,
            templates = session.store.templates().len(),
            events = session.store.instances().len(),
            "session loaded"
        );
        Ok(session)
    }

    /// Stamp and write the session to `path`.
    pub fn save(&mut self, path: &Path) -> Result<(), CliError> {
        self.saved_at = Utc::now();
        let text = serde_json::to_string_pretty(self).map_err(|source| {
            CliError::SessionFormat {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, text).map_err(|source| CliError::SessionIo {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "session saved");
        Ok(())
    }
}
