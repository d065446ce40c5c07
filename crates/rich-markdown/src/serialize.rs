//! Markdown serializer: recursive descent over the tree, dispatching
//! element kinds through the registry. Text leaves escape metacharacters
//! and wrap marks in a fixed nesting order (bold outermost, code
//! innermost) so serialization never depends on the order marks were set.

use rich_doc::{ElementNode, Node, Path, TextNode};

use crate::registry::{ElementRegistry, SerializeCtx};

/// Per-call overrides. The hook lets a caller replace the serialization of
/// a single node (position mapping injects a sentinel this way). The bool
/// argument tells the hook whether escaping is suppressed at that node.
#[derive(Default)]
pub struct SerializeOpts<'a> {
    pub hook: Option<&'a dyn Fn(&Node, &Path, bool) -> Option<String>>,
}

pub fn serialize_nodes(nodes: &[Node], registry: &ElementRegistry) -> String {
    serialize_with(nodes, registry, &SerializeOpts::default())
}

pub fn serialize_with(nodes: &[Node], registry: &ElementRegistry, opts: &SerializeOpts) -> String {
    let mut out = String::new();
    let mut path: Path = Vec::new();
    for (ix, node) in nodes.iter().enumerate() {
        path.push(ix);
        out.push_str(&serialize_node(node, None, ix, &mut path, registry, opts, false));
        path.pop();
    }
    let mut text = out.trim_end().to_string();
    text.push('\n');
    text
}

fn serialize_node(
    node: &Node,
    parent: Option<&ElementNode>,
    index: usize,
    path: &mut Path,
    registry: &ElementRegistry,
    opts: &SerializeOpts,
    no_escape: bool,
) -> String {
    if let Some(hook) = opts.hook
        && let Some(replacement) = hook(node, path, no_escape)
    {
        return replacement;
    }

    match node {
        Node::Text(t) => serialize_text(t, index, no_escape),
        Node::Element(el) => {
            let def = registry.def(&el.kind);
            let raw = def.is_some_and(|d| d.raw_children);

            let mut children = String::new();
            for (ix, child) in el.children.iter().enumerate() {
                path.push(ix);
                children.push_str(&serialize_node(
                    child,
                    Some(el),
                    ix,
                    path,
                    registry,
                    opts,
                    no_escape || raw,
                ));
                path.pop();
            }

            match def {
                Some(def) => {
                    let ctx = SerializeCtx { parent, index };
                    (def.to_markdown)(el, children, &ctx)
                }
                None => {
                    // Unknown kind: children plus a newline, never an error.
                    let mut out = children;
                    out.push('\n');
                    out
                }
            }
        }
    }
}

pub(crate) fn serialize_text(t: &TextNode, index: usize, no_escape: bool) -> String {
    if no_escape {
        return t.text.clone();
    }
    if t.marks.is_plain() {
        let mut body = escape_markdown(&t.text);
        if index == 0 {
            body = fixup_line_start(body);
        }
        return body;
    }

    // Delimiters cannot sit against whitespace; spaces stay outside.
    let start = t.text.len() - t.text.trim_start().len();
    let end = t.text.trim_end().len();
    let trimmed = &t.text[start..end.max(start)];
    if trimmed.is_empty() {
        return escape_markdown(&t.text);
    }

    let mut core = if t.marks.code {
        wrap_code(trimmed)
    } else {
        escape_markdown(trimmed)
    };
    if t.marks.strikethrough {
        core = format!("~~{core}~~");
    }
    if t.marks.underline {
        core = format!("<u>{core}</u>");
    }
    if t.marks.italic {
        core = format!("_{core}_");
    }
    if t.marks.bold {
        core = format!("**{core}**");
    }
    format!("{}{core}{}", &t.text[..start], &t.text[end.max(start)..])
}

pub(crate) fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '$' | '~' | '#' | '|'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Escaped text that starts a block can still spell a list marker or a
/// thematic break; neutralize those at position zero only.
fn fixup_line_start(s: String) -> String {
    let escape_at = if s.starts_with("- ") || s.starts_with("+ ") || s.starts_with("---") {
        Some(0)
    } else {
        let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 && matches!(s.as_bytes().get(digits), Some(b'.') | Some(b')')) {
            Some(digits)
        } else {
            None
        }
    };
    match escape_at {
        Some(ix) => {
            let mut out = String::from(&s[..ix]);
            out.push('\\');
            out.push_str(&s[ix..]);
            out
        }
        None => s,
    }
}

fn wrap_code(text: &str) -> String {
    if text.contains('`') {
        format!("`` {text} ``")
    } else {
        format!("`{text}`")
    }
}
