//! Markdown parser: walks the flat token stream, pairing open/close tokens
//! by kind and nesting depth, and dispatches each closed group to the
//! registered parse rule. Mark groups (strong/em/strikethrough) splice
//! their children in place with the mark folded into the active set.

use regex::Regex;
use serde_json::json;

use rich_doc::{Attrs, Marks, Node};

use crate::cache::BoundedCache;
use crate::registry::ElementRegistry;
use crate::token::{Token, block_spans, tokenize};

pub fn parse_markdown(text: &str, registry: &ElementRegistry) -> Vec<Node> {
    parse_tokens(&tokenize(text), ParseScope::default(), registry)
}

/// Cache-aware parse: top-level blocks are keyed by their raw source slice,
/// so an external patch touching one paragraph reparses only that
/// paragraph. Purely a performance layer; output is identical to
/// `parse_markdown`.
pub fn parse_markdown_cached(
    text: &str,
    registry: &ElementRegistry,
    cache: &mut BoundedCache<String, Vec<Node>>,
) -> Vec<Node> {
    let spans = block_spans(text);
    // Link reference definitions emit no events, so their lines sit in the
    // gaps between block spans and a slice-by-slice parse would lose the
    // definition table. Such documents take the whole-document parse.
    if has_unspanned_content(text, &spans) {
        return parse_markdown(text, registry);
    }

    let mut nodes = Vec::new();
    for span in spans {
        let slice = &text[span];
        if let Some(cached) = cache.get(&slice.to_string()) {
            nodes.extend(cached.iter().cloned());
            continue;
        }
        let parsed = parse_markdown(slice, registry);
        cache.insert(slice.to_string(), parsed.clone());
        nodes.extend(parsed);
    }
    nodes
}

fn has_unspanned_content(text: &str, spans: &[std::ops::Range<usize>]) -> bool {
    let mut covered = 0usize;
    for span in spans {
        let gap = &text[covered..span.start.max(covered)];
        if gap.chars().any(|c| !c.is_whitespace()) {
            return true;
        }
        covered = covered.max(span.end);
    }
    text[covered..].chars().any(|c| !c.is_whitespace())
}

#[derive(Debug, Clone, Copy, Default)]
struct ParseScope {
    marks: Marks,
    in_link: bool,
}

fn parse_tokens(tokens: &[Token], scope: ParseScope, registry: &ElementRegistry) -> Vec<Node> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut marks = scope.marks;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Open { kind, attrs } => {
                let Some(end) = matching_close(tokens, i, kind) else {
                    i += 1;
                    continue;
                };
                let inner = &tokens[i + 1..end];
                match kind.as_str() {
                    "strong" | "em" | "strikethrough" => {
                        let mut child = ParseScope {
                            marks,
                            in_link: scope.in_link,
                        };
                        match kind.as_str() {
                            "strong" => child.marks.bold = true,
                            "em" => child.marks.italic = true,
                            _ => child.marks.strikethrough = true,
                        }
                        extend_merged(&mut nodes, parse_tokens(inner, child, registry));
                    }
                    _ => {
                        let child = ParseScope {
                            marks,
                            in_link: scope.in_link || kind == "link",
                        };
                        let children = parse_tokens(inner, child, registry);
                        match registry.def(kind) {
                            Some(def) => {
                                if let Some(node) =
                                    (def.from_tokens)(kind, attrs.clone(), children, registry)
                                {
                                    nodes.push(node);
                                }
                            }
                            // Unregistered construct: content passes through.
                            None => extend_merged(&mut nodes, children),
                        }
                    }
                }
                i = end + 1;
            }
            // Stray close without a matching open; drop it.
            Token::Close { .. } => i += 1,
            Token::Text(t) => {
                linkify_into(&mut nodes, t, marks, scope.in_link);
                i += 1;
            }
            Token::Code(t) => {
                let mut code_marks = marks;
                code_marks.code = true;
                push_text(&mut nodes, t, code_marks);
                i += 1;
            }
            Token::Math { value, display } => {
                let mut attrs = Attrs::default();
                attrs.insert("value".to_string(), json!(value));
                let kind = if *display { "math_block" } else { "math_inline" };
                nodes.push(Node::void(kind, attrs));
                i += 1;
            }
            Token::Html(raw) => {
                i = handle_html(tokens, i, raw, &mut nodes, &mut marks, true);
            }
            Token::InlineHtml(raw) => {
                i = handle_html(tokens, i, raw, &mut nodes, &mut marks, false);
            }
            Token::Rule => {
                nodes.push(Node::void("hr", Attrs::default()));
                i += 1;
            }
            Token::TaskMarker(checked) => {
                let mut attrs = Attrs::default();
                attrs.insert("checked".to_string(), json!(checked));
                nodes.push(Node::void("checkbox", attrs));
                i += 1;
            }
            Token::SoftBreak | Token::HardBreak => {
                push_text(&mut nodes, " ", marks);
                i += 1;
            }
        }
    }

    nodes
}

fn matching_close(tokens: &[Token], open_ix: usize, kind: &str) -> Option<usize> {
    let mut nesting = 0usize;
    for (j, token) in tokens.iter().enumerate().skip(open_ix + 1) {
        match token {
            Token::Open { kind: k, .. } if k == kind => nesting += 1,
            Token::Close { kind: k } if k == kind => {
                if nesting == 0 {
                    return Some(j);
                }
                nesting -= 1;
            }
            _ => {}
        }
    }
    None
}

/// Append a text leaf, merging into the previous one when the marks match,
/// so soft breaks and escape-split tokens never leave fragmented runs.
fn push_text(nodes: &mut Vec<Node>, text: &str, marks: Marks) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut()
        && last.marks == marks
    {
        last.text.push_str(text);
        return;
    }
    nodes.push(Node::marked_text(text, marks));
}

fn extend_merged(nodes: &mut Vec<Node>, children: Vec<Node>) {
    for child in children {
        match child {
            Node::Text(t) => push_text(nodes, &t.text, t.marks),
            other => nodes.push(other),
        }
    }
}

/// Bare http(s) URLs in plain text become link elements. The serializer
/// emits such links back as bare URLs, which is what keeps the round trip
/// stable.
fn linkify_into(nodes: &mut Vec<Node>, text: &str, marks: Marks, in_link: bool) {
    if in_link {
        push_text(nodes, text, marks);
        return;
    }
    let Ok(re) = Regex::new(r"https?://[^\s<>]+") else {
        push_text(nodes, text, marks);
        return;
    };

    let mut last = 0;
    for m in re.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
        if url.len() <= "https://".len() {
            continue;
        }
        push_text(nodes, &text[last..m.start()], marks);
        let mut attrs = Attrs::default();
        attrs.insert("href".to_string(), json!(url));
        nodes.push(Node::element(
            "link",
            attrs,
            vec![Node::marked_text(url, marks)],
        ));
        last = m.start() + url.len();
    }
    push_text(nodes, &text[last..], marks);
}

/// Raw HTML handling: `<u>` toggles the underline mark, known widget
/// markup (mentions, `<img>`) round-trips back into elements, anything
/// else passes through as an html node.
fn handle_html(
    tokens: &[Token],
    i: usize,
    raw: &str,
    nodes: &mut Vec<Node>,
    marks: &mut Marks,
    block: bool,
) -> usize {
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("<u>") {
        marks.underline = true;
        return i + 1;
    }
    if trimmed.eq_ignore_ascii_case("</u>") {
        marks.underline = false;
        return i + 1;
    }

    if let Some(node) = image_from_html(trimmed) {
        if block {
            // A block-position <img> reparses as a paragraph-wrapped image.
            nodes.push(Node::element("paragraph", Attrs::default(), vec![node]));
        } else {
            nodes.push(node);
        }
        return i + 1;
    }

    if !block
        && let Some(account_id) = mention_account_id(trimmed)
        && let Some((display, next)) = collect_mention_display(tokens, i + 1)
    {
        let mut attrs = Attrs::default();
        attrs.insert("account_id".to_string(), json!(account_id));
        attrs.insert("display".to_string(), json!(display));
        nodes.push(Node::void("mention", attrs));
        return next;
    }

    if block {
        // Block HTML arrives one line per token; coalesce into one node.
        if let Some(Node::Element(el)) = nodes.last_mut()
            && el.kind == "html_block"
        {
            let joined = format!("{}{raw}", el.attr_str("html").unwrap_or(""));
            el.attrs.insert("html".to_string(), json!(joined));
            return i + 1;
        }
        let mut attrs = Attrs::default();
        attrs.insert("html".to_string(), json!(raw));
        nodes.push(Node::void("html_block", attrs));
    } else {
        let mut attrs = Attrs::default();
        attrs.insert("html".to_string(), json!(raw));
        nodes.push(Node::void("html_inline", attrs));
    }
    i + 1
}

fn mention_account_id(html: &str) -> Option<String> {
    let open = Regex::new(r#"^<span[^>]*class="user-mention"[^>]*>$"#).ok()?;
    if !open.is_match(html) {
        return None;
    }
    let id = Regex::new(r#"account-id="([^"]*)""#).ok()?;
    Some(id.captures(html)?.get(1)?.as_str().to_string())
}

/// Scan forward from a mention's opening span for the closing `</span>`,
/// returning the display name (sans `@`) and the index after the close.
fn collect_mention_display(tokens: &[Token], from: usize) -> Option<(String, usize)> {
    let mut display = String::new();
    for (j, token) in tokens.iter().enumerate().skip(from) {
        match token {
            Token::Text(t) => display.push_str(t),
            Token::InlineHtml(t) if t.trim().eq_ignore_ascii_case("</span>") => {
                let display = display.strip_prefix('@').unwrap_or(&display).to_string();
                return Some((display, j + 1));
            }
            _ => return None,
        }
    }
    None
}

fn image_from_html(html: &str) -> Option<Node> {
    if !html.starts_with("<img") {
        return None;
    }
    let mut attrs = Attrs::default();
    let attr = Regex::new(r#"([a-z-]+)="([^"]*)""#).ok()?;
    for caps in attr.captures_iter(html) {
        let (key, value) = (caps.get(1)?.as_str(), caps.get(2)?.as_str());
        match key {
            "src" | "alt" | "title" => {
                attrs.insert(key.to_string(), json!(value));
            }
            "width" | "height" => {
                if let Ok(n) = value.parse::<u64>() {
                    attrs.insert(key.to_string(), json!(n));
                }
            }
            _ => {}
        }
    }
    if !attrs.contains_key("src") {
        return None;
    }
    Some(Node::void("image", attrs))
}
