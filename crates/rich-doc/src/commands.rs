//! Direct input handlers that bypass the diff engine: each builds a small
//! transaction against the current selection and applies it through the
//! editor so undo and normalization see it like any other edit.

use serde_json::json;

use crate::apply::ApplyError;
use crate::editor::Editor;
use crate::node::{Attrs, Node, Path, Point, Selection};
use crate::ops::{AttrPatch, Op, Transaction};
use crate::schema::NodeRole;

/// Insert plain text at the focus point.
pub fn insert_text(editor: &mut Editor, text: &str) -> Result<(), ApplyError> {
    let focus = editor.selection().focus.clone();
    let tx = Transaction::new(vec![Op::InsertText {
        path: focus.path,
        offset: focus.offset,
        text: text.to_string(),
    }])
    .source("input");
    editor.apply(tx)
}

/// Backspace with a collapsed cursor. At the very start of a non-paragraph
/// block the block demotes to a paragraph (its attributes dropped) instead
/// of deleting anything; a heading loses its level, a code block its fence.
/// Elsewhere the character before the cursor is removed.
pub fn delete_backward(editor: &mut Editor) -> Result<bool, ApplyError> {
    let selection = editor.selection().clone();
    if !selection.is_collapsed() {
        return Ok(false);
    }
    let focus = &selection.focus;

    if focus.offset > 0 {
        let start = prev_char_boundary(editor, focus);
        let tx = Transaction::new(vec![Op::RemoveText {
            path: focus.path.clone(),
            range: start..focus.offset,
        }])
        .source("input");
        editor.apply(tx)?;
        return Ok(true);
    }

    let Some(block_path) = lowest_block_path(editor, focus) else {
        return Ok(false);
    };
    if !at_block_start(&block_path, focus) {
        return Ok(false);
    }

    let Some(Node::Element(block)) = crate::node::node_ref(editor.doc(), &block_path) else {
        return Ok(false);
    };
    if block.kind == "paragraph" || editor.schema().is_void(&block.kind) {
        return Ok(false);
    }

    let remove: Vec<String> = block.attrs.keys().cloned().collect();
    let patch = AttrPatch {
        kind: Some("paragraph".to_string()),
        set: Attrs::default(),
        remove,
    };
    let tx = Transaction::new(vec![Op::SetNode {
        path: block_path,
        patch,
    }])
    .source("input");
    editor.apply(tx)?;
    Ok(true)
}

/// Insert a mention of a user at the focus point, splitting the current
/// text leaf around it. The cursor lands after the mention.
pub fn insert_mention(
    editor: &mut Editor,
    account_id: &str,
    display: &str,
) -> Result<(), ApplyError> {
    let focus = editor.selection().focus.clone();
    let mut attrs = Attrs::default();
    attrs.insert("account_id".to_string(), json!(account_id));
    attrs.insert("display".to_string(), json!(display));
    let mention = Node::void("mention", attrs);

    let mut ops = Vec::new();
    let mut insert_path = focus.path.clone();

    let leaf_len = crate::node::node_ref(editor.doc(), &focus.path)
        .and_then(Node::as_text)
        .map(|t| t.text.len())
        .unwrap_or(0);

    if focus.offset == 0 {
        // Mention takes the leaf's slot, pushing it right.
    } else if focus.offset >= leaf_len {
        if let Some(last) = insert_path.last_mut() {
            *last += 1;
        }
    } else {
        ops.push(Op::SplitNode {
            path: focus.path.clone(),
            position: focus.offset,
        });
        if let Some(last) = insert_path.last_mut() {
            *last += 1;
        }
    }
    ops.push(Op::InsertNode {
        path: insert_path.clone(),
        node: mention,
    });

    let mut after_path = insert_path;
    if let Some(last) = after_path.last_mut() {
        *last += 1;
    }
    let tx = Transaction::new(ops)
        .selection_after(Selection::collapsed(Point::new(after_path, 0)))
        .source("input");
    editor.apply(tx)
}

/// Flip the `checked` attribute of the checkbox element at `path`.
pub fn toggle_checkbox(editor: &mut Editor, path: Path) -> Result<(), ApplyError> {
    let checked = crate::node::node_ref(editor.doc(), &path)
        .and_then(Node::as_element)
        .filter(|el| el.kind == "checkbox")
        .and_then(|el| el.attr_bool("checked"))
        .unwrap_or(false);

    let patch = AttrPatch::default().set("checked", json!(!checked));
    let tx = Transaction::new(vec![Op::SetNode { path, patch }]).source("input");
    editor.apply(tx)
}

fn prev_char_boundary(editor: &Editor, focus: &Point) -> usize {
    crate::node::node_ref(editor.doc(), &focus.path)
        .and_then(Node::as_text)
        .map(|t| {
            let mut ix = focus.offset.min(t.text.len()).saturating_sub(1);
            while ix > 0 && !t.text.is_char_boundary(ix) {
                ix -= 1;
            }
            ix
        })
        .unwrap_or(0)
}

/// Deepest ancestor of `point` that the schema classifies as a block.
fn lowest_block_path(editor: &Editor, point: &Point) -> Option<Path> {
    for len in (1..point.path.len()).rev() {
        let prefix = &point.path[..len];
        let Some(Node::Element(el)) = crate::node::node_ref(editor.doc(), prefix) else {
            continue;
        };
        let is_block = editor
            .schema()
            .get(&el.kind)
            .is_some_and(|spec| spec.role == NodeRole::Block);
        if is_block {
            return Some(prefix.to_vec());
        }
    }
    None
}

fn at_block_start(block_path: &[usize], point: &Point) -> bool {
    point.offset == 0 && point.path[block_path.len()..].iter().all(|&ix| ix == 0)
}
