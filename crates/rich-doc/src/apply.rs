use thiserror::Error;

use crate::node::{Document, Node, Selection, TextNode};
use crate::ops::{AttrPatch, Op};

#[derive(Debug, Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("path out of bounds at depth {depth}: {index} >= {len}")]
    OutOfBounds {
        depth: usize,
        index: usize,
        len: usize,
    },
    #[error("non-container node at depth {depth}")]
    NotAContainer { depth: usize },
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("expected a text node at the target path")]
    ExpectedText,
    #[error("expected an element node at the target path")]
    ExpectedElement,
    #[error("cannot merge: {0}")]
    InvalidMerge(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    fn walk<'a>(
        children: &'a mut Vec<Node>,
        path: &[usize],
        depth: usize,
    ) -> Result<&'a mut Node, PathError> {
        let (&ix, rest) = path.split_first().ok_or(PathError::Empty)?;
        let len = children.len();
        let node = children
            .get_mut(ix)
            .ok_or(PathError::OutOfBounds { depth, index: ix, len })?;
        if rest.is_empty() {
            return Ok(node);
        }
        match node {
            Node::Element(el) => walk(&mut el.children, rest, depth + 1),
            Node::Text(_) => Err(PathError::NotAContainer { depth }),
        }
    }
    walk(&mut doc.children, path, 0)
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, ApplyError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        Node::Element(_) => Err(ApplyError::ExpectedText),
    }
}

/// Mutable access to the child list addressed by `parent_path` (the root's
/// children for an empty path).
fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, ApplyError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Text(_) => Err(ApplyError::ExpectedElement),
    }
}

fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

/// Apply one operation to the live tree, returning its inverse. The live
/// selection is transformed as a side effect so it never dangles on a
/// removed node.
pub fn apply_op_to(
    doc: &mut Document,
    selection: &mut Selection,
    op: Op,
) -> Result<Op, ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_insert_text(selection, &path, offset, text.len());
            Ok(Op::RemoveText {
                path,
                range: offset..offset + text.len(),
            })
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start = clamp_to_char_boundary(&text_node.text, range.start);
            let end = clamp_to_char_boundary(&text_node.text, range.end);
            if start >= end {
                return Ok(Op::InsertText {
                    path,
                    offset: start,
                    text: String::new(),
                });
            }
            let removed = text_node.text[start..end].to_string();
            text_node.text.replace_range(start..end, "");
            transform_remove_text(selection, &path, start..end);
            Ok(Op::InsertText {
                path,
                offset: start,
                text: removed,
            })
        }
        Op::InsertNode { path, node } => {
            let (parent_path, index) = split_path(&path)?;
            let children = children_mut(doc, parent_path)?;
            if index > children.len() {
                return Err(ApplyError::InvalidPath(PathError::OutOfBounds {
                    depth: path.len() - 1,
                    index,
                    len: children.len(),
                }));
            }
            children.insert(index, node);
            transform_insert_node(selection, &path);
            Ok(Op::RemoveNode { path })
        }
        Op::RemoveNode { path } => {
            let (parent_path, index) = split_path(&path)?;
            let children = children_mut(doc, parent_path)?;
            if index >= children.len() {
                return Err(ApplyError::InvalidPath(PathError::OutOfBounds {
                    depth: path.len() - 1,
                    index,
                    len: children.len(),
                }));
            }
            let removed = children.remove(index);
            transform_remove_node(selection, &path);
            Ok(Op::InsertNode {
                path,
                node: removed,
            })
        }
        Op::MergeNode { path } => {
            let (parent_path, index) = split_path(&path)?;
            if index == 0 {
                return Err(ApplyError::InvalidMerge(
                    "node has no previous sibling".into(),
                ));
            }
            let children = children_mut(doc, parent_path)?;
            if index >= children.len() {
                return Err(ApplyError::InvalidPath(PathError::OutOfBounds {
                    depth: path.len() - 1,
                    index,
                    len: children.len(),
                }));
            }
            let like_kinds = matches!(
                (&children[index - 1], &children[index]),
                (Node::Text(_), Node::Text(_)) | (Node::Element(_), Node::Element(_))
            );
            if !like_kinds {
                return Err(ApplyError::InvalidMerge(
                    "cannot merge a text node with an element".into(),
                ));
            }
            let removed = children.remove(index);
            let mut prev_path = parent_path.to_vec();
            prev_path.push(index - 1);
            let position = match (&mut children[index - 1], removed) {
                (Node::Text(left), Node::Text(right)) => {
                    let position = left.text.len();
                    left.text.push_str(&right.text);
                    position
                }
                (Node::Element(left), Node::Element(mut right)) => {
                    let position = left.children.len();
                    left.children.append(&mut right.children);
                    position
                }
                _ => {
                    return Err(ApplyError::InvalidMerge(
                        "cannot merge a text node with an element".into(),
                    ));
                }
            };
            transform_merge_node(selection, &path, position);
            Ok(Op::SplitNode {
                path: prev_path,
                position,
            })
        }
        Op::SplitNode { path, position } => {
            let (parent_path, index) = split_path(&path)?;
            let split_off = {
                let node = node_mut(doc, &path)?;
                match node {
                    Node::Text(t) => {
                        let position = clamp_to_char_boundary(&t.text, position);
                        let rest = t.text.split_off(position);
                        (
                            Node::Text(TextNode {
                                text: rest,
                                marks: t.marks,
                            }),
                            position,
                        )
                    }
                    Node::Element(el) => {
                        let position = position.min(el.children.len());
                        let rest = el.children.split_off(position);
                        (
                            Node::Element(crate::node::ElementNode {
                                kind: el.kind.clone(),
                                attrs: el.attrs.clone(),
                                children: rest,
                            }),
                            position,
                        )
                    }
                }
            };
            let (right, position) = split_off;
            let children = children_mut(doc, parent_path)?;
            children.insert(index + 1, right);
            transform_split_node(selection, &path, position);
            let mut sibling_path = parent_path.to_vec();
            sibling_path.push(index + 1);
            Ok(Op::MergeNode { path: sibling_path })
        }
        Op::SetNode { path, patch } => {
            let node = node_mut(doc, &path)?;
            match node {
                Node::Element(el) => {
                    let old_kind = match &patch.kind {
                        Some(kind) => {
                            let old = std::mem::replace(&mut el.kind, kind.clone());
                            Some(old)
                        }
                        None => None,
                    };
                    let mut inverse = patch_attrs(&mut el.attrs, &patch);
                    inverse.kind = old_kind;
                    Ok(Op::SetNode {
                        path,
                        patch: inverse,
                    })
                }
                Node::Text(_) => Err(ApplyError::ExpectedElement),
            }
        }
        Op::SetMarks { path, marks } => {
            let text_node = node_text_mut(doc, &path)?;
            let old = std::mem::replace(&mut text_node.marks, marks);
            Ok(Op::SetMarks { path, marks: old })
        }
    }
}

fn split_path(path: &[usize]) -> Result<(&[usize], usize), ApplyError> {
    let (index, parent) = path
        .split_last()
        .ok_or(ApplyError::InvalidPath(PathError::Empty))?;
    Ok((parent, *index))
}

fn patch_attrs(attrs: &mut crate::node::Attrs, patch: &AttrPatch) -> AttrPatch {
    let mut old_set = crate::node::Attrs::new();
    let mut old_remove: Vec<String> = Vec::new();

    for (k, v) in &patch.set {
        if let Some(prev) = attrs.insert(k.clone(), v.clone()) {
            old_set.insert(k.clone(), prev);
        } else {
            old_remove.push(k.clone());
        }
    }

    for key in &patch.remove {
        if let Some(prev) = attrs.remove(key) {
            old_set.insert(key.clone(), prev);
        }
    }

    AttrPatch {
        kind: None,
        set: old_set,
        remove: old_remove,
    }
}

fn transform_insert_text(selection: &mut Selection, path: &[usize], offset: usize, len: usize) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_remove_text(selection: &mut Selection, path: &[usize], range: std::ops::Range<usize>) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path {
            continue;
        }
        if point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_insert_node(selection: &mut Selection, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last().map(|(ix, p)| (ix, p)) else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_remove_node(selection: &mut Selection, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last().map(|(ix, p)| (ix, p)) else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
        } else if ix == index {
            // Point was inside the removed subtree: collapse to the nearest
            // preceding sibling. normalize_selection re-anchors it to a real
            // text node afterwards.
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

fn transform_merge_node(selection: &mut Selection, path: &[usize], position: usize) {
    let Some((&index, parent_path)) = path.split_last().map(|(ix, p)| (ix, p)) else {
        return;
    };
    let depth = parent_path.len();

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= depth || !point.path.starts_with(parent_path) {
            continue;
        }
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
        } else if ix == index {
            point.path[depth] = index - 1;
            if point.path.len() == depth + 1 {
                // Point addressed the merged text node directly.
                point.offset += position;
            } else {
                point.path[depth + 1] += position;
            }
        }
    }
}

fn transform_split_node(selection: &mut Selection, path: &[usize], position: usize) {
    let Some((&index, parent_path)) = path.split_last().map(|(ix, p)| (ix, p)) else {
        return;
    };
    let depth = parent_path.len();

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= depth || !point.path.starts_with(parent_path) {
            continue;
        }
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix + 1;
        } else if ix == index {
            if point.path.len() == depth + 1 {
                if point.offset > position {
                    point.path[depth] = index + 1;
                    point.offset -= position;
                }
            } else if point.path[depth + 1] >= position {
                point.path[depth] = index + 1;
                point.path[depth + 1] -= position;
            }
        }
    }
}

/// Read-only path resolution, re-exported for the diff engine and tests.
pub fn resolve<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    crate::node::node_ref(doc, path)
}
