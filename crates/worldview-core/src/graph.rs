use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Side, WorldviewError, WorldviewResult};

// ---------------------------------------------------------------------------
// Concept
// ---------------------------------------------------------------------------

/// A named node of the worldview. The name lives in the owning map key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    #[serde(default)]
    pub description: String,
}

impl Concept {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Serializable copy of a graph's full state, laid out as the persisted
/// document: `{"concepts": {...}, "causations": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub concepts: BTreeMap<String, Concept>,
    #[serde(default)]
    pub causations: BTreeMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// ConceptGraph
// ---------------------------------------------------------------------------

/// Directed graph of concepts joined by `cause -> effect` links.
///
/// `causations` only holds keys for causes with at least one effect; an
/// absent key reads as an empty effect list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptGraph {
    concepts: BTreeMap<String, Concept>,
    causations: BTreeMap<String, Vec<String>>,
}

impl ConceptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a loaded snapshot, rejecting state that breaks the
    /// graph invariants.
    pub fn from_snapshot(snapshot: Snapshot) -> WorldviewResult<Self> {
        let Snapshot {
            concepts,
            mut causations,
        } = snapshot;

        causations.retain(|_, effects| !effects.is_empty());

        for (cause, effects) in &causations {
            if !concepts.contains_key(cause) {
                return Err(WorldviewError::CorruptState(format!(
                    "causation from unregistered concept: {cause}"
                )));
            }
            let mut seen = HashSet::with_capacity(effects.len());
            for effect in effects {
                if !concepts.contains_key(effect) {
                    return Err(WorldviewError::CorruptState(format!(
                        "causation {cause} -> {effect} targets unregistered concept"
                    )));
                }
                if !seen.insert(effect.as_str()) {
                    return Err(WorldviewError::CorruptState(format!(
                        "duplicate causation {cause} -> {effect}"
                    )));
                }
            }
        }

        Ok(Self {
            concepts,
            causations,
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            concepts: self.concepts.clone(),
            causations: self.causations.clone(),
        }
    }

    /// Register a concept unless one with that name already exists.
    ///
    /// Returns `true` when the concept was inserted. An existing concept keeps
    /// its original description.
    pub fn add_concept(&mut self, name: &str, description: &str) -> bool {
        if self.concepts.contains_key(name) {
            return false;
        }
        self.concepts.insert(name.to_string(), Concept::new(description));
        true
    }

    /// Record that `cause` leads to `effect`.
    ///
    /// Both names must already be registered; the cause is checked first.
    /// Returns `true` when a new edge was appended, `false` when it was
    /// already present. Nothing changes on error.
    pub fn link(&mut self, cause: &str, effect: &str) -> WorldviewResult<bool> {
        if !self.concepts.contains_key(cause) {
            return Err(WorldviewError::UnknownConcept {
                side: Side::Cause,
                name: cause.to_string(),
            });
        }
        if !self.concepts.contains_key(effect) {
            return Err(WorldviewError::UnknownConcept {
                side: Side::Effect,
                name: effect.to_string(),
            });
        }
        if self.effects_of(cause).iter().any(|e| e == effect) {
            return Ok(false);
        }
        self.causations
            .entry(cause.to_string())
            .or_default()
            .push(effect.to_string());
        Ok(true)
    }

    pub fn concept(&self, name: &str) -> Option<&Concept> {
        self.concepts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.concepts.contains_key(name)
    }

    /// All concepts in ascending name order.
    pub fn concepts(&self) -> impl Iterator<Item = (&str, &Concept)> {
        self.concepts.iter().map(|(name, c)| (name.as_str(), c))
    }

    /// Effects of `cause` in insertion order.
    pub fn effects_of(&self, cause: &str) -> &[String] {
        self.causations.get(cause).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Concepts that are not the effect of any link, in ascending name order.
    pub fn roots(&self) -> Vec<&str> {
        let effects: HashSet<&str> = self
            .causations
            .values()
            .flatten()
            .map(String::as_str)
            .collect();
        self.concepts
            .keys()
            .map(String::as_str)
            .filter(|name| !effects.contains(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn link_count(&self) -> usize {
        self.causations.values().map(Vec::len).sum()
    }
}
