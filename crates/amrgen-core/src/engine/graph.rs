//! # AMR Graph
//!
//! Arena representation of the rooted semantic graph that generation consumes
//! and stage 1 rewrites in place.
//!
//! ## Key Components
//!
//! - **Vertex**: a concept with optional proper name, sentence mode and POS,
//!   plus the mutable [`Annotation`] written by the structural pass
//! - **Edge**: a labeled relation; every vertex owns one *instance edge* whose
//!   label is its own concept and whose target is the sentinel vertex
//! - **AmrGraph**: the arena; vertices and edges are addressed by stable
//!   `u32` ids and never move
//!
//! ## Design
//!
//! Incoming/outgoing lists store ids, not references, so structural edits
//! (SWAP, MERGE, reentrancy uncoupling) are list splices. Removed vertices and
//! edges stay in the arena as tombstones; ids are never reused.
//!
//! Reentrancy is resolved once by [`AmrGraph::uncouple_reentrancies`], which
//! replaces the target of every reentrant edge after the first with a fresh
//! *link* vertex pointing back at the original.
//!
//! ## Example
//!
//! ```rust
//! use amrgen_core::engine::graph::AmrGraph;
//!
//! let mut graph = AmrGraph::new();
//! let want = graph.add_vertex("want-01");
//! let boy = graph.add_vertex("boy");
//! graph.add_edge(want, boy, "ARG0").unwrap();
//! assert_eq!(graph.root(), want);
//! assert_eq!(graph.parent(boy).map(|(_, p)| p), Some(want));
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::engine::errors::GenError;
use crate::engine::roles::{self, MULTI_SENTENCE};

/// A unique identifier for a vertex in the graph arena.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VertexId(pub u32);

/// A unique identifier for an edge in the graph arena.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

/// Grammatical sentence mode carried by a vertex (`:mode` in AMR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Imperative,
    Interrogative,
    Expressive,
}

/// Mutable per-vertex record written by the structural pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Set by DELETE; the vertex is realized as the empty string.
    pub deleted: bool,
    /// Incremented when the vertex is swapped upward, decremented when swapped
    /// downward.
    pub swap_count: i32,
    /// Set on link vertices: the vertex whose realization the link shares.
    pub original: Option<VertexId>,
}

/// A concept vertex.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// The unique vertex identifier
    pub id: VertexId,
    /// The concept (e.g. `want-01`, `boy`)
    pub instance: Arc<str>,
    /// Proper-name string for named entities (`"Barack Obama"`)
    pub name: Option<String>,
    /// Sentence mode, if annotated
    pub mode: Option<Mode>,
    /// Part of speech fixed for this vertex (set by MERGE)
    pub pos: Option<Arc<str>>,
    /// Incoming edges in insertion order
    pub incoming: SmallVec<[EdgeId; 2]>,
    /// Outgoing edges in order; includes the instance edge
    pub outgoing: Vec<EdgeId>,
    /// Structural annotation
    pub annotation: Annotation,
    /// Tombstone set when the vertex was merged into another one
    pub removed: bool,
}

impl Vertex {
    /// Returns true if this vertex stands in for a reentrant original.
    pub fn is_link(&self) -> bool {
        self.annotation.original.is_some()
    }
}

/// A labeled edge.
#[derive(Debug, Clone)]
pub struct Edge {
    /// The unique edge identifier
    pub id: EdgeId,
    /// The source vertex
    pub from: VertexId,
    /// The target vertex (the sentinel for instance edges)
    pub to: VertexId,
    /// Role label without leading colon, or the concept for instance edges
    pub label: Arc<str>,
    /// True for the self-describing edge of a vertex
    pub is_instance: bool,
    /// Tombstone set when the edge was dropped by a MERGE
    pub removed: bool,
}

/// Concept and part of speech produced by merging two vertices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub concept: String,
    pub pos: String,
}

/// The rooted AMR graph arena.
#[derive(Debug, Clone)]
pub struct AmrGraph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    root: Option<VertexId>,
    sentinel: VertexId,
}

impl Default for AmrGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AmrGraph {
    /// Creates an empty graph holding only the sentinel vertex.
    pub fn new() -> Self {
        let sentinel = VertexId(0);
        Self {
            vertices: vec![Vertex {
                id: sentinel,
                instance: Arc::from(""),
                name: None,
                mode: None,
                pos: None,
                incoming: SmallVec::new(),
                outgoing: Vec::new(),
                annotation: Annotation::default(),
                removed: false,
            }],
            edges: Vec::new(),
            root: None,
            sentinel,
        }
    }

    /// Adds a vertex with its instance edge. The first vertex added becomes
    /// the root unless [`set_root`](Self::set_root) says otherwise.
    pub fn add_vertex(&mut self, concept: &str) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex {
            id,
            instance: Arc::from(concept),
            name: None,
            mode: None,
            pos: None,
            incoming: SmallVec::new(),
            outgoing: Vec::new(),
            annotation: Annotation::default(),
            removed: false,
        });
        let instance_edge = self.push_edge(id, self.sentinel, concept, true);
        self.vertices[id.0 as usize].outgoing.push(instance_edge);
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Adds a named-entity vertex.
    pub fn add_named_vertex(&mut self, concept: &str, name: &str) -> VertexId {
        let id = self.add_vertex(concept);
        self.vertices[id.0 as usize].name = Some(name.to_string());
        id
    }

    /// Adds a role edge `from -> to`.
    pub fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        label: &str,
    ) -> Result<EdgeId, GenError> {
        self.get(from)?;
        self.get(to)?;
        let edge = self.push_edge(from, to, label, false);
        self.vertices[from.0 as usize].outgoing.push(edge);
        self.vertices[to.0 as usize].incoming.push(edge);
        Ok(edge)
    }

    fn push_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        label: &str,
        is_instance: bool,
    ) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            from,
            to,
            label: Arc::from(label),
            is_instance,
            removed: false,
        });
        id
    }

    /// Sets the root vertex.
    pub fn set_root(&mut self, root: VertexId) -> Result<(), GenError> {
        self.get(root)?;
        self.root = Some(root);
        Ok(())
    }

    /// Sets the sentence mode of a vertex.
    pub fn set_mode(&mut self, v: VertexId, mode: Mode) -> Result<(), GenError> {
        self.get_mut(v)?.mode = Some(mode);
        Ok(())
    }

    /// Returns the root vertex (the sentinel for an empty graph).
    pub fn root(&self) -> VertexId {
        self.root.unwrap_or(self.sentinel)
    }

    /// Returns the sentinel vertex that instance edges point to.
    pub fn sentinel(&self) -> VertexId {
        self.sentinel
    }

    /// Returns true if the graph holds no concept vertices.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Looks up a vertex by id.
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0 as usize)
    }

    /// Looks up an edge by id.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0 as usize)
    }

    /// Looks up a live, non-sentinel vertex or fails with `InvalidStructure`.
    pub fn get(&self, id: VertexId) -> Result<&Vertex, GenError> {
        match self.vertices.get(id.0 as usize) {
            Some(v) if id != self.sentinel && !v.removed => Ok(v),
            _ => Err(GenError::InvalidStructure(format!("unknown vertex {}", id.0))),
        }
    }

    fn get_mut(&mut self, id: VertexId) -> Result<&mut Vertex, GenError> {
        self.get(id)?;
        Ok(&mut self.vertices[id.0 as usize])
    }

    /// Looks up an edge or fails with `InvalidStructure`.
    pub fn get_edge(&self, id: EdgeId) -> Result<&Edge, GenError> {
        self.edges
            .get(id.0 as usize)
            .filter(|e| !e.removed)
            .ok_or_else(|| GenError::InvalidStructure(format!("unknown edge {}", id.0)))
    }

    /// Mutable access to a vertex annotation.
    pub fn annotation_mut(&mut self, id: VertexId) -> Result<&mut Annotation, GenError> {
        Ok(&mut self.get_mut(id)?.annotation)
    }

    /// Iterates live concept vertices in id order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices
            .iter()
            .skip(1)
            .filter(|v| !v.removed)
    }

    /// Iterates live edges in id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| !e.removed)
    }

    /// Number of live concept vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    /// Returns the instance edge of a vertex.
    pub fn instance_edge(&self, v: VertexId) -> Option<EdgeId> {
        self.vertex(v)?
            .outgoing
            .iter()
            .copied()
            .find(|&e| self.edges[e.0 as usize].is_instance)
    }

    /// Iterates `(edge, child)` pairs of the non-instance outgoing edges.
    pub fn children(&self, v: VertexId) -> impl Iterator<Item = (EdgeId, VertexId)> + '_ {
        self.vertex(v)
            .map(|vx| vx.outgoing.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&e| &self.edges[e.0 as usize])
            .filter(|e| !e.is_instance)
            .map(|e| (e.id, e.to))
    }

    /// Number of non-instance outgoing edges.
    pub fn child_count(&self, v: VertexId) -> usize {
        self.children(v).count()
    }

    /// Returns the first incoming edge and its source.
    pub fn parent(&self, v: VertexId) -> Option<(EdgeId, VertexId)> {
        let vx = self.vertex(v)?;
        let e = *vx.incoming.first()?;
        Some((e, self.edges[e.0 as usize].from))
    }

    /// Label of the first incoming edge.
    pub fn incoming_label(&self, v: VertexId) -> Option<&str> {
        let (e, _) = self.parent(v)?;
        Some(&self.edges[e.0 as usize].label)
    }

    /// Returns true if `v` starts a sentence: it has no parent, or its parent
    /// is the multi-sentence root.
    pub fn is_sentence_boundary(&self, v: VertexId) -> bool {
        match self.parent(v) {
            None => true,
            Some((_, p)) => self
                .vertex(p)
                .map(|pv| &*pv.instance == MULTI_SENTENCE)
                .unwrap_or(false),
        }
    }

    /// Returns the vertices reachable from the root with children strictly
    /// before their parents (post-order, following outgoing edge order).
    ///
    /// Each vertex appears once even if it is reentrant.
    pub fn bottom_up_order(&self) -> Vec<VertexId> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let mut order = Vec::with_capacity(self.vertices.len());
        let mut visited: FxHashSet<VertexId> = FxHashSet::default();
        // (vertex, next child position)
        let mut stack: Vec<(VertexId, usize)> = vec![(root, 0)];
        visited.insert(root);
        while let Some((v, pos)) = stack.pop() {
            let next = self
                .children(v)
                .skip(pos)
                .map(|(_, c)| c)
                .enumerate()
                .find(|(_, c)| !visited.contains(c));
            match next {
                Some((offset, child)) => {
                    stack.push((v, pos + offset + 1));
                    visited.insert(child);
                    stack.push((child, 0));
                }
                None => order.push(v),
            }
        }
        order
    }

    /// Replaces the target of every reentrant edge after the first with a
    /// fresh link vertex.
    ///
    /// "First" is the first edge reaching the vertex in a depth-first
    /// pre-order walk from the root. Returns the created links.
    pub fn uncouple_reentrancies(&mut self) -> Vec<VertexId> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let mut links = Vec::new();
        let mut visited: FxHashSet<VertexId> = FxHashSet::default();
        let mut stack: Vec<(VertexId, usize)> = vec![(root, 0)];
        visited.insert(root);
        while let Some((v, pos)) = stack.pop() {
            let Some((e, target)) = self.children(v).nth(pos) else {
                continue;
            };
            stack.push((v, pos + 1));
            if visited.insert(target) {
                stack.push((target, 0));
                continue;
            }
            let link = self.add_link(target);
            self.vertices[target.0 as usize].incoming.retain(|x| *x != e);
            self.edges[e.0 as usize].to = link;
            self.vertices[link.0 as usize].incoming.push(e);
            links.push(link);
        }
        links
    }

    fn add_link(&mut self, original: VertexId) -> VertexId {
        let concept = self.vertices[original.0 as usize].instance.clone();
        let name = self.vertices[original.0 as usize].name.clone();
        let link = self.add_vertex(&concept);
        let lv = &mut self.vertices[link.0 as usize];
        lv.name = name;
        lv.annotation.original = Some(original);
        link
    }

    /// Swaps `child` above `parent`.
    ///
    /// The connecting edge is reversed and relabeled with the inverse role,
    /// `child` takes the slot `parent` occupied under the grandparent (or
    /// becomes root), and the swap counters move by one in opposite
    /// directions.
    pub fn swap(&mut self, parent: VertexId, child: VertexId) -> Result<(), GenError> {
        self.get(parent)?;
        self.get(child)?;
        let connecting = self
            .children(parent)
            .find(|&(_, c)| c == child)
            .map(|(e, _)| e)
            .ok_or_else(|| {
                GenError::InvalidStructure(format!(
                    "cannot swap {} and {}: not parent and child",
                    parent.0, child.0
                ))
            })?;
        let grandparent_edge = self.vertices[parent.0 as usize].incoming.first().copied();

        self.vertices[parent.0 as usize].outgoing.retain(|e| *e != connecting);
        self.vertices[child.0 as usize].incoming.retain(|e| *e != connecting);
        {
            let edge = &mut self.edges[connecting.0 as usize];
            edge.from = child;
            edge.to = parent;
            edge.label = Arc::from(roles::inverse_label(&edge.label));
        }
        self.vertices[child.0 as usize].outgoing.push(connecting);

        match grandparent_edge {
            Some(ge) => {
                self.vertices[parent.0 as usize].incoming.retain(|e| *e != ge);
                self.edges[ge.0 as usize].to = child;
                self.vertices[child.0 as usize].incoming.insert(0, ge);
            }
            None => {
                if self.root == Some(parent) {
                    self.root = Some(child);
                }
            }
        }
        self.vertices[parent.0 as usize].incoming.push(connecting);

        self.vertices[child.0 as usize].annotation.swap_count += 1;
        self.vertices[parent.0 as usize].annotation.swap_count -= 1;
        Ok(())
    }

    /// Folds `absorbed` into `keep`.
    ///
    /// `keep` must be the parent or a sibling of `absorbed`. The kept vertex
    /// takes the merge result as concept and POS, and every non-instance
    /// outgoing edge of the absorbed vertex is reparented to it.
    pub fn merge(
        &mut self,
        keep: VertexId,
        absorbed: VertexId,
        result: &MergeResult,
    ) -> Result<(), GenError> {
        self.get(keep)?;
        self.get(absorbed)?;
        if keep == absorbed {
            return Err(GenError::InvalidStructure(format!(
                "cannot merge vertex {} into itself",
                keep.0
            )));
        }
        let direct = self
            .children(keep)
            .find(|&(_, c)| c == absorbed)
            .map(|(e, _)| e);
        let dropped = match direct {
            Some(e) => e,
            None => {
                let siblings = match (self.parent(keep), self.parent(absorbed)) {
                    (Some((_, p1)), Some((e2, p2))) if p1 == p2 => Some(e2),
                    _ => None,
                };
                siblings.ok_or_else(|| {
                    GenError::InvalidStructure(format!(
                        "cannot merge {} into {}: neither parent and child nor siblings",
                        absorbed.0, keep.0
                    ))
                })?
            }
        };

        let dropped_from = self.edges[dropped.0 as usize].from;
        self.vertices[dropped_from.0 as usize].outgoing.retain(|e| *e != dropped);
        self.edges[dropped.0 as usize].removed = true;

        let moved: Vec<EdgeId> = std::mem::take(&mut self.vertices[absorbed.0 as usize].outgoing);
        for e in moved {
            if self.edges[e.0 as usize].is_instance {
                self.edges[e.0 as usize].removed = true;
                continue;
            }
            self.edges[e.0 as usize].from = keep;
            self.vertices[keep.0 as usize].outgoing.push(e);
        }

        let absorbed_vertex = &mut self.vertices[absorbed.0 as usize];
        absorbed_vertex.incoming.clear();
        absorbed_vertex.removed = true;

        for vertex in self.vertices.iter_mut() {
            if vertex.annotation.original == Some(absorbed) {
                vertex.annotation.original = Some(keep);
            }
        }

        self.set_concept(keep, &result.concept)?;
        self.vertices[keep.0 as usize].pos = Some(Arc::from(result.pos.as_str()));
        Ok(())
    }

    /// Renames a vertex concept, keeping its instance edge label in sync.
    pub fn set_concept(&mut self, v: VertexId, concept: &str) -> Result<(), GenError> {
        self.get(v)?;
        self.vertices[v.0 as usize].instance = Arc::from(concept);
        if let Some(e) = self.instance_edge(v) {
            self.edges[e.0 as usize].label = Arc::from(concept);
        }
        Ok(())
    }

    /// Checks the tree invariants that hold after the structural pass: at
    /// most one incoming edge per vertex, no incoming edge on the root, and
    /// exactly one instance edge per vertex.
    pub fn validate_tree(&self) -> Result<(), GenError> {
        for v in self.vertices() {
            if v.incoming.len() > 1 {
                return Err(GenError::InvalidStructure(format!(
                    "vertex {} ({}) has {} incoming edges",
                    v.id.0,
                    v.instance,
                    v.incoming.len()
                )));
            }
            let instance_edges = v
                .outgoing
                .iter()
                .filter(|e| self.edges[e.0 as usize].is_instance)
                .count();
            if instance_edges != 1 {
                return Err(GenError::InvalidStructure(format!(
                    "vertex {} ({}) has {} instance edges",
                    v.id.0, v.instance, instance_edges
                )));
            }
        }
        if let Some(root) = self.root {
            if !self.vertices[root.0 as usize].incoming.is_empty() {
                return Err(GenError::InvalidStructure(format!(
                    "root {} has a parent",
                    root.0
                )));
            }
        }
        Ok(())
    }

    /// Renders the subtree under `v` in PENMAN-like notation, for logs and
    /// test failure messages. Links print as `*concept`.
    pub fn render(&self, v: VertexId) -> String {
        let mut out = String::new();
        let mut visited = FxHashSet::default();
        self.render_into(v, &mut out, &mut visited);
        out
    }

    fn render_into(&self, v: VertexId, out: &mut String, visited: &mut FxHashSet<VertexId>) {
        let Some(vertex) = self.vertex(v) else {
            return;
        };
        if !visited.insert(v) {
            let _ = write!(out, "v{}", v.0);
            return;
        }
        let marker = if vertex.is_link() { "*" } else { "" };
        let _ = write!(out, "(v{}/{}{}", v.0, marker, vertex.instance);
        if let Some(name) = &vertex.name {
            let _ = write!(out, " :name \"{}\"", name);
        }
        for (e, child) in self.children(v) {
            let _ = write!(out, " :{} ", self.edges[e.0 as usize].label);
            self.render_into(child, out, visited);
        }
        out.push(')');
    }
}
