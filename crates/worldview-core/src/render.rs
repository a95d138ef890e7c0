//! Forest rendering of a [`ConceptGraph`].
//!
//! Every root (a concept nobody causes) starts a tree, visited in ascending
//! name order. Effects are expanded depth-first in insertion order. Only
//! nodes on the active path from the current root count as cycles: a node
//! reached twice through different parents (a diamond) is expanded in full
//! each time, while a node that reappears below itself is printed once more
//! followed by a `(cycle)` line and not descended into.
//!
//! Concepts that sit on or below root-less cycles are never reached from a
//! root. Once the roots are done, each source strongly connected component
//! of what is left (a cycle nothing outside it points into) starts a further
//! tree at its smallest member, so every concept is shown and no concept
//! that is merely an effect ends up at top level.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;
use petgraph::Direction;

use crate::graph::ConceptGraph;

pub const EMPTY_MESSAGE: &str = "Worldview is empty";
pub const CYCLE_MARKER: &str = "(cycle)";
const INDENT: &str = "  ";

/// One line of rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderLine {
    Node { depth: usize, name: String },
    Cycle { depth: usize },
    Empty,
}

impl fmt::Display for RenderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { depth, name } => write!(f, "{}{name}", INDENT.repeat(*depth)),
            Self::Cycle { depth } => write!(f, "{}{CYCLE_MARKER}", INDENT.repeat(*depth)),
            Self::Empty => f.write_str(EMPTY_MESSAGE),
        }
    }
}

/// A node on the active path and the index of its next effect to expand.
struct Frame<'a> {
    name: &'a str,
    next: usize,
}

/// Depth-first walk with an explicit stack, so long chains cannot exhaust
/// the thread stack. `frames` is the active path; `on_path` mirrors it.
struct Walk<'a> {
    graph: &'a ConceptGraph,
    frames: Vec<Frame<'a>>,
    on_path: HashSet<&'a str>,
    rendered: HashSet<&'a str>,
    lines: Vec<RenderLine>,
}

impl<'a> Walk<'a> {
    fn tree(&mut self, root: &'a str) {
        let graph = self.graph;
        self.enter(root, 0);

        while let Some(frame) = self.frames.last_mut() {
            let Some(effect) = graph.effects_of(frame.name).get(frame.next) else {
                if let Some(done) = self.frames.pop() {
                    self.on_path.remove(done.name);
                }
                continue;
            };
            frame.next += 1;
            let depth = self.frames.len();
            self.enter(effect, depth);
        }
    }

    /// Emit `name` and push it on the path, or emit a cycle marker if it is
    /// already there.
    fn enter(&mut self, name: &'a str, depth: usize) {
        self.lines.push(RenderLine::Node {
            depth,
            name: name.to_string(),
        });
        self.rendered.insert(name);

        if self.on_path.contains(name) {
            self.lines.push(RenderLine::Cycle { depth: depth + 1 });
            return;
        }
        self.on_path.insert(name);
        self.frames.push(Frame { name, next: 0 });
    }
}

impl ConceptGraph {
    /// Render the whole graph as an indented forest.
    ///
    /// An empty graph yields a single [`RenderLine::Empty`].
    pub fn render(&self) -> Vec<RenderLine> {
        if self.is_empty() {
            return vec![RenderLine::Empty];
        }

        let mut walk = Walk {
            graph: self,
            frames: Vec::new(),
            on_path: HashSet::new(),
            rendered: HashSet::with_capacity(self.len()),
            lines: Vec::new(),
        };

        for root in self.roots() {
            walk.tree(root);
        }
        for start in self.cycle_entry_points(&walk.rendered) {
            walk.tree(start);
        }

        walk.lines
    }

    /// [`render`](Self::render) joined into newline-separated text.
    pub fn render_text(&self) -> String {
        self.render()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Smallest member of every source component among the concepts not yet
    /// rendered, in ascending order.
    ///
    /// Everything downstream of a rendered concept is rendered too, so the
    /// leftover subgraph has no edges coming in from outside it.
    fn cycle_entry_points(&self, rendered: &HashSet<&str>) -> Vec<&str> {
        let mut dag: DiGraph<&str, ()> = DiGraph::new();
        let mut index = HashMap::new();
        for (name, _) in self.concepts() {
            if !rendered.contains(name) {
                index.insert(name, dag.add_node(name));
            }
        }
        for (&cause, &from) in &index {
            for effect in self.effects_of(cause) {
                if let Some(&to) = index.get(effect.as_str()) {
                    dag.add_edge(from, to, ());
                }
            }
        }

        let mut starts: Vec<&str> = kosaraju_scc(&dag)
            .into_iter()
            .filter(|component| {
                component.iter().all(|&node| {
                    dag.neighbors_directed(node, Direction::Incoming)
                        .all(|pred| component.contains(&pred))
                })
            })
            .filter_map(|component| component.into_iter().map(|node| dag[node]).min())
            .collect();
        starts.sort_unstable();
        starts
    }
}
