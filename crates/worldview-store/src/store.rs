use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use worldview_core::{ConceptGraph, GraphStore, Snapshot, WorldviewError, WorldviewResult};

use crate::atomic::write_atomic;

/// Persists a [`ConceptGraph`] as a pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphStore for JsonFileStore {
    fn load(&self) -> WorldviewResult<ConceptGraph> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no worldview at {}, starting empty", self.path.display());
                return Ok(ConceptGraph::new());
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| {
            WorldviewError::CorruptState(format!("{}: {e}", self.path.display()))
        })?;
        let graph = ConceptGraph::from_snapshot(snapshot).map_err(|e| match e {
            WorldviewError::CorruptState(reason) => {
                WorldviewError::CorruptState(format!("{}: {reason}", self.path.display()))
            }
            other => other,
        })?;

        debug!(
            "loaded {} concepts, {} links from {}",
            graph.len(),
            graph.link_count(),
            self.path.display()
        );
        Ok(graph)
    }

    fn save(&self, graph: &ConceptGraph) -> WorldviewResult<()> {
        let json = serde_json::to_string_pretty(&graph.snapshot())?;
        write_atomic(&self.path, json.as_bytes())?;
        debug!(
            "saved {} concepts, {} links to {}",
            graph.len(),
            graph.link_count(),
            self.path.display()
        );
        Ok(())
    }
}
