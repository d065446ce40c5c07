use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::node::{Attrs, ElementKind, Marks, Node, Path, Selection};

/// A single structural edit. Operations are produced by the diff engine or
/// by input handlers, applied immediately one at a time, then discarded;
/// only undo keeps their inverses around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertText {
        #[serde(default)]
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        #[serde(default)]
        path: Path,
        range: Range<usize>,
    },
    InsertNode {
        #[serde(default)]
        path: Path,
        node: Node,
    },
    RemoveNode {
        #[serde(default)]
        path: Path,
    },
    /// Merge the node at `path` into its previous sibling: text nodes
    /// concatenate, elements adopt children.
    MergeNode {
        #[serde(default)]
        path: Path,
    },
    /// Split the node at `path`: a text node at byte offset `position`, an
    /// element at child index `position`. The new right half is inserted as
    /// the next sibling and inherits marks/kind/attrs.
    SplitNode {
        #[serde(default)]
        path: Path,
        position: usize,
    },
    SetNode {
        #[serde(default)]
        path: Path,
        patch: AttrPatch,
    },
    SetMarks {
        #[serde(default)]
        path: Path,
        marks: Marks,
    },
}

impl Op {
    pub fn path(&self) -> &Path {
        match self {
            Op::InsertText { path, .. }
            | Op::RemoveText { path, .. }
            | Op::InsertNode { path, .. }
            | Op::RemoveNode { path }
            | Op::MergeNode { path }
            | Op::SplitNode { path, .. }
            | Op::SetNode { path, .. }
            | Op::SetMarks { path, .. } => path,
        }
    }

    pub fn path_mut(&mut self) -> &mut Path {
        match self {
            Op::InsertText { path, .. }
            | Op::RemoveText { path, .. }
            | Op::InsertNode { path, .. }
            | Op::RemoveNode { path }
            | Op::MergeNode { path }
            | Op::SplitNode { path, .. }
            | Op::SetNode { path, .. }
            | Op::SetMarks { path, .. } => path,
        }
    }
}

/// Attribute patch for `SetNode`. `kind` retypes the element in place
/// (e.g. heading back to paragraph on backspace).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ElementKind>,
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AttrPatch {
    pub fn retype(kind: impl Into<ElementKind>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    pub fn set(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.set.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub ops: Vec<Op>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Selection>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            selection_after: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn selection_after(mut self, selection_after: Selection) -> Self {
        self.selection_after = Some(selection_after);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }
}
