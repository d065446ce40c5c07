//! Mapping between tree points and (line, column) positions in the
//! serialized markdown, for jump-to-source and jump-to-editor features.
//! Both directions are best-effort and return `None` instead of failing.

use rich_doc::{Node, Point, TextNode};

use crate::registry::ElementRegistry;
use crate::serialize::{SerializeOpts, serialize_text, serialize_with};

const SENTINEL: char = '\u{e000}';

/// Zero-based (line, column) of `point` in the canonical markdown of
/// `nodes`. Works by serializing with a sentinel spliced into the target
/// text leaf and locating it in the output. The spliced leaf goes through
/// the regular text serialization, so escapes and mark delimiters shift
/// the column exactly as they do in the real output.
pub fn point_to_markdown_position(
    nodes: &[Node],
    point: &Point,
    registry: &ElementRegistry,
) -> Option<(usize, usize)> {
    let hook = |node: &Node, path: &Vec<usize>, no_escape: bool| -> Option<String> {
        if path != &point.path {
            return None;
        }
        let t = node.as_text()?;
        let offset = point.offset.min(t.text.len());
        if !t.text.is_char_boundary(offset) {
            return None;
        }
        let mut text = String::with_capacity(t.text.len() + SENTINEL.len_utf8());
        text.push_str(&t.text[..offset]);
        text.push(SENTINEL);
        text.push_str(&t.text[offset..]);
        let leaf = TextNode {
            text,
            marks: t.marks,
        };
        Some(serialize_text(&leaf, *path.last()?, no_escape))
    };

    let opts = SerializeOpts { hook: Some(&hook) };
    let markdown = serialize_with(nodes, registry, &opts);

    let at = markdown.find(SENTINEL)?;
    let before = &markdown[..at];
    let line = before.matches('\n').count();
    let col = before.chars().rev().take_while(|&c| c != '\n').count();
    Some((line, col))
}

/// Best-effort inverse: locate the top-level block whose serialized lines
/// cover `line`, then land at its first text leaf with the column clamped
/// to that leaf. Unresolvable targets yield `None`.
pub fn markdown_position_to_point(
    nodes: &[Node],
    registry: &ElementRegistry,
    line: usize,
    col: usize,
) -> Option<Point> {
    let mut consumed = 0usize;
    for (ix, node) in nodes.iter().enumerate() {
        let block = serialize_with(std::slice::from_ref(node), registry, &SerializeOpts::default());
        let block_lines = block.trim_end().matches('\n').count() + 1;
        // Serialized blocks are separated by one blank line.
        let span = block_lines + 1;
        if line < consumed + span {
            let mut path = vec![ix];
            let point = first_text_point_under(node, &mut path)?;
            let len = text_len_at(node, &point.path[1..]);
            return Some(Point::new(point.path, col.min(len)));
        }
        consumed += span;
    }
    None
}

fn first_text_point_under(node: &Node, path: &mut Vec<usize>) -> Option<Point> {
    match node {
        Node::Text(_) => Some(Point::new(path.clone(), 0)),
        Node::Element(el) => {
            for (ix, child) in el.children.iter().enumerate() {
                path.push(ix);
                if let Some(point) = first_text_point_under(child, path) {
                    return Some(point);
                }
                path.pop();
            }
            None
        }
    }
}

fn text_len_at(node: &Node, rel_path: &[usize]) -> usize {
    let mut cur = node;
    for &ix in rel_path {
        match cur {
            Node::Element(el) => match el.children.get(ix) {
                Some(child) => cur = child,
                None => return 0,
            },
            Node::Text(_) => return 0,
        }
    }
    cur.as_text().map(|t| t.text.len()).unwrap_or(0)
}
