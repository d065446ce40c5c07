//! Tree diff engine: computes the operation sequence that transforms one
//! sibling list into another. Every emitted path is valid against the tree
//! as it stands *after* all previously emitted operations — paths are
//! rebased while emitting, never against the original tree.

use similar::{ChangeTag, TextDiff};

use crate::node::{Marks, Node, Path, TextNode};
use crate::ops::Op;

/// Operations that turn a live tree holding `before` into `after`. Applying
/// them in order with the applier reproduces `after` exactly; the count is
/// close to minimal but not guaranteed minimal. `diff(a, a)` is empty.
pub fn diff(before: &[Node], after: &[Node]) -> Vec<Op> {
    let mut ops = Vec::new();
    diff_children(before, after, &mut Vec::new(), &mut ops);
    ops
}

fn diff_children(old: &[Node], new: &[Node], parent_path: &mut Path, ops: &mut Vec<Op>) {
    let matches = lcs_matches(old, new);

    let mut live_index = 0usize;
    let mut old_ix = 0usize;
    let mut new_ix = 0usize;

    for &(m_old, m_new) in matches.iter().chain(std::iter::once(&(old.len(), new.len()))) {
        let olds = &old[old_ix..m_old];
        let news = &new[new_ix..m_new];
        live_index = handle_segment(olds, news, parent_path, live_index, ops);
        old_ix = m_old + 1;
        new_ix = m_new + 1;
        // The matched node itself is untouched.
        live_index += 1;
    }
}

fn handle_segment(
    olds: &[Node],
    news: &[Node],
    parent_path: &mut Path,
    live_index: usize,
    ops: &mut Vec<Op>,
) -> usize {
    if olds.is_empty() && news.is_empty() {
        return live_index;
    }

    if !olds.is_empty() && !news.is_empty() && all_text(olds) && all_text(news) {
        change_text_nodes(olds, news, parent_path, live_index, ops);
        return live_index + news.len();
    }

    let common = olds.len().min(news.len());
    for k in 0..common {
        parent_path.push(live_index + k);
        match (&olds[k], &news[k]) {
            (Node::Element(a), Node::Element(b)) if a.kind == b.kind && a.attrs == b.attrs => {
                diff_children(&a.children, &b.children, parent_path, ops);
            }
            (Node::Text(a), Node::Text(b)) => {
                let path = parent_path.clone();
                parent_path.pop();
                change_single_text(a, b, path, ops);
                continue;
            }
            _ => {
                // Incompatible siblings: replace rather than mutate in place.
                ops.push(Op::RemoveNode {
                    path: parent_path.clone(),
                });
                ops.push(Op::InsertNode {
                    path: parent_path.clone(),
                    node: news[k].clone(),
                });
            }
        }
        parent_path.pop();
    }

    // Surplus old nodes all vacate the same index as their predecessors go.
    for _ in common..olds.len() {
        let mut path = parent_path.clone();
        path.push(live_index + common);
        ops.push(Op::RemoveNode { path });
    }

    for (q, node) in news.iter().enumerate().skip(common) {
        let mut path = parent_path.clone();
        path.push(live_index + q);
        ops.push(Op::InsertNode {
            path,
            node: node.clone(),
        });
    }

    live_index + news.len()
}

fn all_text(nodes: &[Node]) -> bool {
    nodes.iter().all(Node::is_text)
}

fn change_single_text(old: &TextNode, new: &TextNode, path: Path, ops: &mut Vec<Op>) {
    if old == new {
        return;
    }
    if old.text != new.text {
        text_ops(&old.text, &new.text, &path, ops);
    }
    if old.marks != new.marks {
        ops.push(Op::SetMarks {
            path,
            marks: new.marks,
        });
    }
}

/// Transform a run of old text siblings into a run of new text siblings:
/// merge the olds into one node, rewrite its text with a character-level
/// diff, then split and re-mark to match the target run shape.
///
/// Grounded in the original merge-then-split strategy; keeping the edits at
/// the character level is what stops remote text patches from replacing
/// whole nodes (and losing the local cursor).
fn change_text_nodes(
    olds: &[Node],
    news: &[Node],
    parent_path: &Path,
    live_index: usize,
    ops: &mut Vec<Op>,
) {
    let mut merged_text = String::new();
    let mut merged_marks = Marks::default();
    for (i, node) in olds.iter().enumerate() {
        let Node::Text(t) = node else { return };
        if i == 0 {
            merged_marks = t.marks;
        }
        merged_text.push_str(&t.text);
    }

    // Everything merges into the node at live_index; the node after it
    // keeps sliding into live_index + 1.
    for _ in 1..olds.len() {
        let mut path = parent_path.clone();
        path.push(live_index + 1);
        ops.push(Op::MergeNode { path });
    }

    let target: String = news
        .iter()
        .filter_map(|n| n.as_text().map(|t| t.text.as_str()))
        .collect();

    let mut node_path = parent_path.clone();
    node_path.push(live_index);

    if merged_text != target {
        text_ops(&merged_text, &target, &node_path, ops);
    }

    let mut current_marks = merged_marks;
    let mut cursor_path = node_path;
    for (i, node) in news.iter().enumerate() {
        let Node::Text(t) = node else { return };
        if t.marks != current_marks {
            ops.push(Op::SetMarks {
                path: cursor_path.clone(),
                marks: t.marks,
            });
        }
        current_marks = t.marks;
        if i + 1 < news.len() {
            ops.push(Op::SplitNode {
                path: cursor_path.clone(),
                position: t.text.len(),
            });
            if let Some(last) = cursor_path.last_mut() {
                *last += 1;
            }
        }
    }
}

/// Character-level insert/remove ops rewriting `old` into `new` at `path`.
/// Offsets are byte offsets tracked against the evolving string.
fn text_ops(old: &str, new: &str, path: &Path, ops: &mut Vec<Op>) {
    let text_diff = TextDiff::from_chars(old, new);

    let mut offset = 0usize;
    let mut pending_delete = 0usize;
    let mut pending_insert = String::new();

    let mut flush = |offset: &mut usize, pending_delete: &mut usize, pending_insert: &mut String, ops: &mut Vec<Op>| {
        if *pending_delete > 0 {
            ops.push(Op::RemoveText {
                path: path.clone(),
                range: *offset..*offset + *pending_delete,
            });
            *pending_delete = 0;
        }
        if !pending_insert.is_empty() {
            ops.push(Op::InsertText {
                path: path.clone(),
                offset: *offset,
                text: std::mem::take(pending_insert),
            });
            *offset += ops
                .last()
                .and_then(|op| match op {
                    Op::InsertText { text, .. } => Some(text.len()),
                    _ => None,
                })
                .unwrap_or(0);
        }
    };

    for change in text_diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => {
                flush(&mut offset, &mut pending_delete, &mut pending_insert, ops);
                offset += change.value().len();
            }
            ChangeTag::Delete => {
                pending_delete += change.value().len();
            }
            ChangeTag::Insert => {
                pending_insert.push_str(change.value());
            }
        }
    }
    flush(&mut offset, &mut pending_delete, &mut pending_insert, ops);
}

/// Longest common subsequence over deep node equality, returned as matched
/// (old_index, new_index) pairs in increasing order.
fn lcs_matches(old: &[Node], new: &[Node]) -> Vec<(usize, usize)> {
    let n = old.len();
    let m = new.len();
    if n == 0 || m == 0 {
        return Vec::new();
    }

    let mut table = vec![0u32; (n + 1) * (m + 1)];
    let at = |i: usize, j: usize| i * (m + 1) + j;

    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[at(i, j)] = if old[i] == new[j] {
                table[at(i + 1, j + 1)] + 1
            } else {
                table[at(i + 1, j)].max(table[at(i, j + 1)])
            };
        }
    }

    let mut matches = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < n && j < m {
        if old[i] == new[j] {
            matches.push((i, j));
            i += 1;
            j += 1;
        } else if table[at(i + 1, j)] >= table[at(i, j + 1)] {
            i += 1;
        } else {
            j += 1;
        }
    }
    matches
}
