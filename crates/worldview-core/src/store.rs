use crate::error::WorldviewResult;
use crate::graph::ConceptGraph;

/// Whole-snapshot persistence for a [`ConceptGraph`].
///
/// Implementations never mutate a live graph: `load` builds a fresh one and
/// `save` rewrites the complete persisted document.
pub trait GraphStore {
    fn load(&self) -> WorldviewResult<ConceptGraph>;
    fn save(&self, graph: &ConceptGraph) -> WorldviewResult<()>;
}
