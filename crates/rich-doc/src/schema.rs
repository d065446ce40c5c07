use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::node::{Document, Node, Point, Selection};
use crate::ops::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    /// Void: a single placeholder empty text child.
    None,
    BlockOnly,
    InlineOnly,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
}

impl NodeSpec {
    pub fn block(kind: &str, children: ChildConstraint) -> Self {
        Self {
            kind: kind.to_string(),
            role: NodeRole::Block,
            is_void: false,
            children,
        }
    }

    pub fn block_void(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            role: NodeRole::Block,
            is_void: true,
            children: ChildConstraint::None,
        }
    }

    pub fn inline(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            role: NodeRole::Inline,
            is_void: false,
            children: ChildConstraint::InlineOnly,
        }
    }

    pub fn inline_void(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            role: NodeRole::Inline,
            is_void: true,
            children: ChildConstraint::None,
        }
    }
}

/// The structural contract of the document: which element kinds exist, their
/// block/inline role, voidness and child constraints. Normalization and the
/// serializer both consult it; the element registry in the markdown crate
/// extends each spec with parse/serialize rules.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    specs: HashMap<String, NodeSpec>,
}

impl Schema {
    pub fn new(specs: impl IntoIterator<Item = NodeSpec>) -> Result<Self, String> {
        let mut schema = Self::default();
        for spec in specs {
            schema.register(spec)?;
        }
        Ok(schema)
    }

    pub fn register(&mut self, spec: NodeSpec) -> Result<(), String> {
        if self.specs.contains_key(&spec.kind) {
            return Err(format!("duplicate node spec kind: {}", spec.kind));
        }
        self.specs.insert(spec.kind.clone(), spec);
        Ok(())
    }

    pub fn standard() -> Self {
        let specs = vec![
            NodeSpec::block("paragraph", ChildConstraint::InlineOnly),
            NodeSpec::block("heading", ChildConstraint::InlineOnly),
            NodeSpec::block("blockquote", ChildConstraint::BlockOnly),
            NodeSpec::block("bullet_list", ChildConstraint::BlockOnly),
            NodeSpec::block("ordered_list", ChildConstraint::BlockOnly),
            NodeSpec::block("list_item", ChildConstraint::Any),
            NodeSpec::block("code_block", ChildConstraint::InlineOnly),
            NodeSpec::block_void("hr"),
            NodeSpec::block_void("html_block"),
            NodeSpec::block_void("math_block"),
            NodeSpec::inline("link"),
            NodeSpec::inline_void("image"),
            NodeSpec::inline_void("mention"),
            NodeSpec::inline_void("math_inline"),
            NodeSpec::inline_void("checkbox"),
            NodeSpec::inline_void("html_inline"),
        ];
        Self::new(specs).unwrap_or_default()
    }

    pub fn get(&self, kind: &str) -> Option<&NodeSpec> {
        self.specs.get(kind)
    }

    pub fn is_known_kind(&self, kind: &str) -> bool {
        self.specs.contains_key(kind)
    }

    pub fn is_void(&self, kind: &str) -> bool {
        self.get(kind).is_some_and(|s| s.is_void)
    }

    pub fn is_inline(&self, kind: &str) -> bool {
        self.get(kind).is_some_and(|s| s.role == NodeRole::Inline)
    }

    fn child_constraint(&self, kind: &str) -> ChildConstraint {
        self.get(kind)
            .map(|s| s.children)
            .unwrap_or(ChildConstraint::Any)
    }

    /// One round of normalization. Returns ops computed against `doc` as it
    /// stands; the editor applies them and re-runs to a fixpoint.
    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        let passes: [fn(&Schema, &Document) -> Vec<Op>; 4] = [
            ensure_non_empty_document,
            ensure_leaf_children,
            remove_stray_empty_text,
            merge_adjacent_text_leaves,
        ];
        for pass in passes {
            let ops = pass(self, doc);
            if !ops.is_empty() {
                return ops;
            }
        }
        Vec::new()
    }

    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = first_text_point(doc).unwrap_or(Point {
            path: vec![0],
            offset: 0,
        });

        let anchor = clamp_point_to_text(doc, &selection.anchor).unwrap_or_else(|| {
            clamp_point_to_text(doc, &selection.focus).unwrap_or_else(|| fallback.clone())
        });
        let focus =
            clamp_point_to_text(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }
}

fn ensure_non_empty_document(_schema: &Schema, doc: &Document) -> Vec<Op> {
    if doc.children.is_empty() {
        return vec![Op::InsertNode {
            path: vec![0],
            node: Node::paragraph(""),
        }];
    }
    Vec::new()
}

/// Inline-only blocks and voids must hold at least one text leaf so the
/// selection always has somewhere to land.
fn ensure_leaf_children(schema: &Schema, doc: &Document) -> Vec<Op> {
    let mut ops = Vec::new();

    fn walk(schema: &Schema, children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);

            match schema.child_constraint(&el.kind) {
                ChildConstraint::InlineOnly | ChildConstraint::None => {
                    let has_text = el.children.iter().any(Node::is_text);
                    if !has_text {
                        let mut insert_path = path.clone();
                        insert_path.push(0);
                        ops.push(Op::InsertNode {
                            path: insert_path,
                            node: Node::text(""),
                        });
                    } else {
                        walk(schema, &el.children, path, ops);
                    }
                }
                ChildConstraint::BlockOnly | ChildConstraint::Any => {
                    walk(schema, &el.children, path, ops);
                }
            }

            path.pop();
        }
    }

    walk(schema, &doc.children, &mut Vec::new(), &mut ops);
    ops
}

/// Empty text nodes are only legitimate next to an inline element sibling
/// (or as the sole placeholder child); everything else is removed.
fn remove_stray_empty_text(schema: &Schema, doc: &Document) -> Vec<Op> {
    let mut ops = Vec::new();

    fn is_inline_element(schema: &Schema, node: &Node) -> bool {
        node.as_element()
            .is_some_and(|el| schema.is_inline(&el.kind))
    }

    fn walk(schema: &Schema, children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
        // Right-to-left so earlier removal paths stay valid.
        for ix in (0..children.len()).rev() {
            match &children[ix] {
                Node::Element(el) => {
                    path.push(ix);
                    walk(schema, &el.children, path, ops);
                    path.pop();
                }
                Node::Text(t) => {
                    if !t.text.is_empty() || children.len() == 1 {
                        continue;
                    }
                    let prev_inline =
                        ix > 0 && is_inline_element(schema, &children[ix - 1]);
                    let next_inline = ix + 1 < children.len()
                        && is_inline_element(schema, &children[ix + 1]);
                    if !prev_inline && !next_inline {
                        let mut remove_path = path.clone();
                        remove_path.push(ix);
                        ops.push(Op::RemoveNode { path: remove_path });
                    }
                }
            }
        }
    }

    walk(schema, &doc.children, &mut Vec::new(), &mut ops);
    ops
}

fn merge_adjacent_text_leaves(_schema: &Schema, doc: &Document) -> Vec<Op> {
    // Only the first child list that needs merging is fixed per round; the
    // fixpoint loop picks up the rest. Merges are emitted right-to-left so
    // each path is valid after the ops before it.
    fn walk(children: &[Node], path: &mut Vec<usize>) -> Vec<Op> {
        let mut ops = Vec::new();
        for ix in (1..children.len()).rev() {
            let (Some(Node::Text(left)), Some(Node::Text(right))) =
                (children.get(ix - 1), children.get(ix))
            else {
                continue;
            };
            if left.marks != right.marks {
                continue;
            }
            if left.text.is_empty() || right.text.is_empty() {
                // Placeholder empties next to voids are handled elsewhere.
                continue;
            }
            let mut merge_path = path.clone();
            merge_path.push(ix);
            ops.push(Op::MergeNode { path: merge_path });
        }
        if !ops.is_empty() {
            return ops;
        }
        for (ix, node) in children.iter().enumerate() {
            if let Node::Element(el) = node {
                path.push(ix);
                let ops = walk(&el.children, path);
                path.pop();
                if !ops.is_empty() {
                    return ops;
                }
            }
        }
        Vec::new()
    }

    walk(&doc.children, &mut Vec::new())
}

pub fn first_text_point(doc: &Document) -> Option<Point> {
    fn walk(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => {
                    let point = Point {
                        path: path.clone(),
                        offset: 0,
                    };
                    path.pop();
                    return Some(point);
                }
                Node::Element(el) => {
                    if let Some(point) = walk(&el.children, path) {
                        path.pop();
                        return Some(point);
                    }
                }
            }
            path.pop();
        }
        None
    }

    walk(&doc.children, &mut Vec::new())
}

/// Clamp a point to the nearest existing text node at or below its path.
fn clamp_point_to_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => {
                    let point = Point {
                        path: path.clone(),
                        offset: 0,
                    };
                    path.pop();
                    return Some(point);
                }
                Node::Element(el) => {
                    if let Some(point) = first_text_descendant(&el.children, path) {
                        path.pop();
                        return Some(point);
                    }
                }
            }
            path.pop();
        }
        None
    }

    let mut resolved: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved,
                    offset: point.offset.min(t.text.len()),
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
        }
    }

    let node = crate::node::node_ref(doc, &resolved)?;
    match node {
        Node::Text(t) => Some(Point {
            path: resolved,
            offset: point.offset.min(t.text.len()),
        }),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved),
    }
}
