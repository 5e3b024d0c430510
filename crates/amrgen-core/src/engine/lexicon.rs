//! Lexical resources: merge table, never-delete list, proper-name table and
//! the default realizer.
//!
//! The tables are plain data and deserialize from JSON; the default realizer
//! is a trait because morphological realization is an external component.
//! [`SuffixRealizer`] is a minimal built-in implementation good enough for
//! tests and for concepts whose realization is the concept stem.

use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::engine::beam::Scored;
use crate::engine::errors::GenError;
use crate::engine::graph::{MergeResult, Vertex};
use crate::engine::roles::MULTI_SENTENCE;
use crate::engine::transition::Syntax;

/// Fallback surface forms for concepts and names.
pub trait DefaultRealizer: Send + Sync {
    /// Surface form of a concept under an optional syntactic annotation.
    fn default_realization(&self, concept: &str, syntax: Option<&Syntax>) -> String;

    /// Surface form of a proper name.
    fn name_realization(&self, name: &str) -> String {
        name.to_string()
    }

    /// Forms a link to `original` may be realized as (pronouns, a repeated
    /// noun, or nothing).
    fn link_realizations(&self, original: &Vertex) -> Vec<String>;
}

/// Strips PropBank sense suffixes (`want-01` -> `want`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixRealizer;

impl SuffixRealizer {
    pub fn stem(concept: &str) -> &str {
        match concept.rsplit_once('-') {
            Some((stem, sense))
                if !stem.is_empty()
                    && !sense.is_empty()
                    && sense.bytes().all(|b| b.is_ascii_digit()) =>
            {
                stem
            }
            _ => concept,
        }
    }
}

impl DefaultRealizer for SuffixRealizer {
    fn default_realization(&self, concept: &str, _syntax: Option<&Syntax>) -> String {
        Self::stem(concept).to_string()
    }

    fn link_realizations(&self, original: &Vertex) -> Vec<String> {
        let mut forms = vec![String::new()];
        match original.name.as_deref() {
            Some(name) => forms.push(self.name_realization(name)),
            None => forms.push(self.default_realization(&original.instance, None)),
        }
        match &*original.instance {
            "person" | "man" | "boy" => forms.push("he".into()),
            "woman" | "girl" => forms.push("she".into()),
            "i" | "you" | "we" | "they" | "he" | "she" | "it" => {}
            _ => forms.push("it".into()),
        }
        forms
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MergeEntry {
    parent: String,
    child: String,
    #[serde(flatten)]
    result: MergeResult,
}

/// Permitted MERGE transitions keyed by `(parent concept, child concept)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MergeEntry>", into = "Vec<MergeEntry>")]
pub struct MergeTable {
    entries: FxHashMap<(String, String), MergeResult>,
}

impl MergeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parent: &str, child: &str, concept: &str, pos: &str) {
        self.entries.insert(
            (parent.to_string(), child.to_string()),
            MergeResult {
                concept: concept.to_string(),
                pos: pos.to_string(),
            },
        );
    }

    pub fn get(&self, parent: &str, child: &str) -> Option<&MergeResult> {
        // owned key; the table is small and lookups are per stage-1 vertex
        self.entries.get(&(parent.to_string(), child.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<MergeEntry>> for MergeTable {
    fn from(list: Vec<MergeEntry>) -> Self {
        let entries = list
            .into_iter()
            .map(|e| ((e.parent, e.child), e.result))
            .collect();
        Self { entries }
    }
}

impl From<MergeTable> for Vec<MergeEntry> {
    fn from(table: MergeTable) -> Self {
        let mut list: Vec<MergeEntry> = table
            .entries
            .into_iter()
            .map(|((parent, child), result)| MergeEntry {
                parent,
                child,
                result,
            })
            .collect();
        list.sort_by(|a, b| (&a.parent, &a.child).cmp(&(&b.parent, &b.child)));
        list
    }
}

/// Where a name's companion word sits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameAttachment {
    /// The name alone.
    NameOnly,
    /// `word Name`
    Left(String),
    /// `Name word`
    Right(String),
}

impl NameAttachment {
    pub fn realize(&self, name: &str) -> String {
        match self {
            Self::NameOnly => name.to_string(),
            Self::Left(word) => format!("{} {}", word, name),
            Self::Right(word) => format!("{} {}", name, word),
        }
    }
}

/// One observed realization of a named concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameObservation {
    pub attachment: NameAttachment,
    pub count: u32,
}

/// Observed realizations of named entities per concept (`city`, `person`...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProperNameTable {
    entries: FxHashMap<String, Vec<NameObservation>>,
}

impl ProperNameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, concept: &str, attachment: NameAttachment, count: u32) {
        let list = self.entries.entry(concept.to_string()).or_default();
        match list.iter_mut().find(|o| o.attachment == attachment) {
            Some(existing) => existing.count += count,
            None => list.push(NameObservation { attachment, count }),
        }
    }

    /// Realizations of `name` under `concept`, with probability
    /// count / total. Empty if the concept was never observed.
    pub fn candidates(&self, concept: &str, name: &str) -> Vec<Scored<String>> {
        let Some(list) = self.entries.get(concept) else {
            return Vec::new();
        };
        let total: u64 = list.iter().map(|o| u64::from(o.count)).sum();
        if total == 0 {
            return Vec::new();
        }
        list.iter()
            .filter(|o| o.count > 0)
            .map(|o| Scored::new(o.attachment.realize(name), f64::from(o.count) / total as f64))
            .collect()
    }
}

/// JSON form of the lexical tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconTables {
    pub merges: MergeTable,
    pub never_delete: Vec<String>,
    pub proper_names: ProperNameTable,
}

/// Lexical resources of a generation run.
pub struct Resources {
    pub merges: MergeTable,
    pub never_delete: FxHashSet<String>,
    pub proper_names: ProperNameTable,
    pub realizer: Box<dyn DefaultRealizer>,
}

impl Default for Resources {
    fn default() -> Self {
        Self::new(LexiconTables::default(), Box::new(SuffixRealizer))
    }
}

impl Resources {
    /// Builds resources from tables. `multi-sentence` is always protected
    /// from deletion.
    pub fn new(tables: LexiconTables, realizer: Box<dyn DefaultRealizer>) -> Self {
        let mut never_delete: FxHashSet<String> = tables.never_delete.into_iter().collect();
        never_delete.insert(MULTI_SENTENCE.to_string());
        Self {
            merges: tables.merges,
            never_delete,
            proper_names: tables.proper_names,
            realizer,
        }
    }

    /// Parses [`LexiconTables`] from JSON and pairs them with `realizer`.
    pub fn from_json_str(json: &str, realizer: Box<dyn DefaultRealizer>) -> Result<Self, GenError> {
        let tables: LexiconTables = serde_json::from_str(json)?;
        Ok(Self::new(tables, realizer))
    }

    pub fn from_path(
        path: impl AsRef<Path>,
        realizer: Box<dyn DefaultRealizer>,
    ) -> Result<Self, GenError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let resources = Self::from_json_str(&json, realizer)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            merges = resources.merges.len(),
            never_delete = resources.never_delete.len(),
            "loaded lexical resources"
        );
        Ok(resources)
    }

    pub fn can_delete(&self, concept: &str) -> bool {
        !self.never_delete.contains(concept)
    }
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resources")
            .field("merges", &self.merges.len())
            .field("never_delete", &self.never_delete.len())
            .field("proper_names", &self.proper_names.entries.len())
            .finish_non_exhaustive()
    }
}
