pub mod error;
pub mod graph;
pub mod render;
pub mod store;

pub use error::{Side, WorldviewError, WorldviewResult};
pub use graph::{Concept, ConceptGraph, Snapshot};
pub use render::{RenderLine, CYCLE_MARKER, EMPTY_MESSAGE};
pub use store::GraphStore;
