//! Auto-format: after a boundary character lands at the end of a text run,
//! reparse that run standalone and, when the parse is materially different
//! from plain text, splice or replace through the regular diff/apply
//! pipeline so the transform is one undoable step.

use rich_doc::{
    ApplyError, Attrs, Document, Editor, Node, NodeRole, Op, Point, Selection, Transaction, diff,
    node_ref,
};

use crate::parse::parse_markdown;
use crate::registry::ElementRegistry;

/// Returns true when a transform was applied. The caller force-saves the
/// pre-transform state first (the controller wrapper does this).
pub fn autoformat(editor: &mut Editor, registry: &ElementRegistry) -> Result<bool, ApplyError> {
    let selection = editor.selection().clone();
    if !selection.is_collapsed() {
        return Ok(false);
    }
    let focus = selection.focus;

    let Some(Node::Text(leaf)) = node_ref(editor.doc(), &focus.path) else {
        return Ok(false);
    };
    // Only at the end of the run, right after the just-typed boundary.
    if focus.offset != leaf.text.len() || !leaf.text.ends_with(' ') {
        return Ok(false);
    }
    let src = leaf.text[..leaf.text.len() - 1].to_string();
    if src.trim().is_empty() {
        return Ok(false);
    }

    let parsed = parse_markdown(&src, registry);
    if parsed.is_empty() {
        return Ok(false);
    }

    // Plain text parses to one paragraph holding one unmarked run; nothing
    // to do then, and that check is what stops formatting churn.
    let trivial = vec![Node::element(
        "paragraph",
        Attrs::default(),
        vec![Node::text(src.clone())],
    )];
    if parsed == trivial {
        return Ok(false);
    }

    let Some((&leaf_ix, parent_path)) = focus.path.split_last() else {
        return Ok(false);
    };

    let inline_runs = parsed.len() == 1
        && parsed[0].as_element().is_some_and(|el| {
            el.kind == "paragraph" && el.children.iter().all(|c| is_inline(registry, c))
        });

    if inline_runs {
        let runs = match &parsed[0] {
            Node::Element(el) => el.children.clone(),
            Node::Text(_) => return Ok(false),
        };
        return splice_inline(editor, parent_path, leaf_ix, runs);
    }

    // Block-level constructs only fire from the first child position, so a
    // phrase typed mid-line never turns into a rule or heading.
    if leaf_ix != 0 {
        return Ok(false);
    }
    let parent_is_block = node_ref(editor.doc(), parent_path)
        .and_then(Node::as_element)
        .and_then(|el| registry.schema().get(&el.kind))
        .is_some_and(|spec| spec.role == NodeRole::Block);
    if !parent_is_block {
        return Ok(false);
    }

    replace_block(editor, parent_path.to_vec(), parsed, registry)
}

fn is_inline(registry: &ElementRegistry, node: &Node) -> bool {
    match node {
        Node::Text(_) => true,
        Node::Element(el) => registry.schema().is_inline(&el.kind),
    }
}

/// Splice freshly parsed inline runs over the old text leaf. The trailing
/// boundary space comes back as its own run so the cursor has somewhere to
/// keep typing.
fn splice_inline(
    editor: &mut Editor,
    parent_path: &[usize],
    leaf_ix: usize,
    runs: Vec<Node>,
) -> Result<bool, ApplyError> {
    let old_children = match node_ref(editor.doc(), parent_path) {
        Some(Node::Element(el)) => el.children.clone(),
        _ => return Ok(false),
    };

    let mut new_children = old_children.clone();
    let replacement: Vec<Node> = runs.into_iter().chain([Node::text(" ")]).collect();
    new_children.splice(leaf_ix..leaf_ix + 1, replacement);

    let mut ops = diff(&old_children, &new_children);
    if ops.is_empty() {
        return Ok(false);
    }
    for op in &mut ops {
        let mut full = parent_path.to_vec();
        full.extend(op.path().iter().copied());
        *op.path_mut() = full;
    }
    editor.apply(Transaction::new(ops).source("autoformat"))?;

    if let Some(point) = last_text_point(editor.doc(), parent_path) {
        editor.set_selection(Selection::collapsed(point));
    }
    Ok(true)
}

/// Replace the whole current block with the parsed construct plus a
/// trailing empty paragraph, so the document never ends in a void block.
fn replace_block(
    editor: &mut Editor,
    block_path: Vec<usize>,
    parsed: Vec<Node>,
    registry: &ElementRegistry,
) -> Result<bool, ApplyError> {
    let first_kind = parsed[0]
        .as_element()
        .map(|el| el.kind.clone())
        .unwrap_or_default();
    let block_count = parsed.len();

    let mut ops = vec![Op::RemoveNode {
        path: block_path.clone(),
    }];
    let mut at = block_path.clone();
    for node in parsed {
        ops.push(Op::InsertNode {
            path: at.clone(),
            node,
        });
        if let Some(last) = at.last_mut() {
            *last += 1;
        }
    }
    ops.push(Op::InsertNode {
        path: at.clone(),
        node: Node::paragraph(""),
    });
    editor.apply(Transaction::new(ops).source("autoformat"))?;

    // Typing continues inside headings, lists and code blocks; for voids
    // like rules the cursor moves past, into the trailing paragraph.
    let stay = matches!(
        first_kind.as_str(),
        "heading" | "code_block" | "bullet_list" | "ordered_list" | "blockquote"
    ) && registry.schema().is_known_kind(&first_kind);
    if stay && block_count == 1
        && let Some(point) = last_text_point(editor.doc(), &block_path)
    {
        editor.set_selection(Selection::collapsed(point));
    } else {
        let mut trailing = at;
        trailing.push(0);
        editor.set_selection(Selection::collapsed(Point::new(trailing, 0)));
    }
    Ok(true)
}

fn last_text_point(doc: &Document, base: &[usize]) -> Option<Point> {
    match node_ref(doc, base)? {
        Node::Text(t) => Some(Point::new(base.to_vec(), t.text.len())),
        Node::Element(el) => {
            for ix in (0..el.children.len()).rev() {
                let mut path = base.to_vec();
                path.push(ix);
                if let Some(point) = last_text_point(doc, &path) {
                    return Some(point);
                }
            }
            None
        }
    }
}
