//! Markdown tokenization: pulldown-cmark events flattened into a token
//! stream with explicit open/close pairs, which is what the parser's state
//! machine walks.

use pulldown_cmark::{
    CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};
use serde_json::json;

use rich_doc::Attrs;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open { kind: String, attrs: Attrs },
    Close { kind: String },
    Text(String),
    Code(String),
    Math { value: String, display: bool },
    Html(String),
    InlineHtml(String),
    Rule,
    TaskMarker(bool),
    SoftBreak,
    HardBreak,
}

fn options() -> Options {
    Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS | Options::ENABLE_MATH
}

fn heading_level_to_u64(level: HeadingLevel) -> u64 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn open(kind: &str) -> Token {
    Token::Open {
        kind: kind.to_string(),
        attrs: Attrs::default(),
    }
}

fn open_with(kind: &str, attrs: Attrs) -> Token {
    Token::Open {
        kind: kind.to_string(),
        attrs,
    }
}

fn close(kind: &str) -> Token {
    Token::Close {
        kind: kind.to_string(),
    }
}

pub fn tokenize(markdown: &str) -> Vec<Token> {
    let parser = Parser::new_ext(markdown, options());
    let mut tokens = Vec::new();

    for event in parser {
        match event {
            Event::Start(tag) => tokens.push(start_token(tag)),
            Event::End(tag) => tokens.push(end_token(tag)),
            Event::Text(t) => tokens.push(Token::Text(t.into_string())),
            Event::Code(t) => tokens.push(Token::Code(t.into_string())),
            Event::InlineMath(t) => tokens.push(Token::Math {
                value: t.into_string(),
                display: false,
            }),
            Event::DisplayMath(t) => tokens.push(Token::Math {
                value: t.into_string(),
                display: true,
            }),
            Event::Html(t) => tokens.push(Token::Html(t.into_string())),
            Event::InlineHtml(t) => tokens.push(Token::InlineHtml(t.into_string())),
            Event::Rule => tokens.push(Token::Rule),
            Event::TaskListMarker(checked) => tokens.push(Token::TaskMarker(checked)),
            Event::SoftBreak => tokens.push(Token::SoftBreak),
            Event::HardBreak => tokens.push(Token::HardBreak),
            Event::FootnoteReference(t) => tokens.push(Token::Text(format!("[^{t}]"))),
        }
    }

    tokens
}

fn start_token(tag: Tag) -> Token {
    match tag {
        Tag::Paragraph => open("paragraph"),
        Tag::Heading { level, .. } => {
            let mut attrs = Attrs::default();
            attrs.insert("level".to_string(), json!(heading_level_to_u64(level)));
            open_with("heading", attrs)
        }
        Tag::BlockQuote(..) => open("blockquote"),
        Tag::CodeBlock(kind) => {
            let mut attrs = Attrs::default();
            if let CodeBlockKind::Fenced(info) = kind {
                let lang = info.split_whitespace().next().unwrap_or("");
                if !lang.is_empty() {
                    attrs.insert("lang".to_string(), json!(lang));
                }
            }
            open_with("code_block", attrs)
        }
        Tag::List(Some(start)) => {
            let mut attrs = Attrs::default();
            attrs.insert("start".to_string(), json!(start));
            open_with("ordered_list", attrs)
        }
        Tag::List(None) => open("bullet_list"),
        Tag::Item => open("list_item"),
        Tag::Emphasis => open("em"),
        Tag::Strong => open("strong"),
        Tag::Strikethrough => open("strikethrough"),
        Tag::Link {
            dest_url, title, ..
        } => {
            let mut attrs = Attrs::default();
            attrs.insert("href".to_string(), json!(dest_url.as_ref()));
            if !title.is_empty() {
                attrs.insert("title".to_string(), json!(title.as_ref()));
            }
            open_with("link", attrs)
        }
        Tag::Image {
            dest_url, title, ..
        } => {
            let mut attrs = Attrs::default();
            attrs.insert("src".to_string(), json!(dest_url.as_ref()));
            if !title.is_empty() {
                attrs.insert("title".to_string(), json!(title.as_ref()));
            }
            open_with("image", attrs)
        }
        Tag::HtmlBlock => open("html_scope"),
        // Tables, footnotes and metadata blocks are outside the standard
        // element set; their content still flows through as plain tokens.
        other => open(&generic_kind_name(&format!("{other:?}"))),
    }
}

fn end_token(tag: TagEnd) -> Token {
    match tag {
        TagEnd::Paragraph => close("paragraph"),
        TagEnd::Heading(..) => close("heading"),
        TagEnd::BlockQuote(..) => close("blockquote"),
        TagEnd::CodeBlock => close("code_block"),
        TagEnd::List(true) => close("ordered_list"),
        TagEnd::List(false) => close("bullet_list"),
        TagEnd::Item => close("list_item"),
        TagEnd::Emphasis => close("em"),
        TagEnd::Strong => close("strong"),
        TagEnd::Strikethrough => close("strikethrough"),
        TagEnd::Link => close("link"),
        TagEnd::Image => close("image"),
        TagEnd::HtmlBlock => close("html_scope"),
        other => close(&generic_kind_name(&format!("{other:?}"))),
    }
}

/// Stable kind name for constructs we do not model: the debug name of the
/// tag variant, lowercased. Open/close pairs still match, so the parser
/// passes their children through untouched.
fn generic_kind_name(debug: &str) -> String {
    debug
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Byte ranges of the top-level blocks of `markdown`, in order. Used to
/// key the parse cache by raw block source.
pub fn block_spans(markdown: &str) -> Vec<std::ops::Range<usize>> {
    let parser = Parser::new_ext(markdown, options());
    let mut spans = Vec::new();
    let mut depth: usize = 0;

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(_) => {
                if depth == 0 {
                    spans.push(range);
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Rule if depth == 0 => spans.push(range),
            _ => {}
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_opens_with_its_level() {
        let tokens = tokenize("## hi");
        let Token::Open { kind, attrs } = &tokens[0] else {
            panic!("expected an open token, got {:?}", tokens[0]);
        };
        assert_eq!(kind, "heading");
        assert_eq!(attrs.get("level"), Some(&serde_json::json!(2)));
        assert_eq!(tokens[1], Token::Text("hi".to_string()));
        assert_eq!(
            tokens[2],
            Token::Close {
                kind: "heading".to_string()
            }
        );
    }

    #[test]
    fn ordered_list_carries_its_start() {
        let tokens = tokenize("3. third");
        let Token::Open { kind, attrs } = &tokens[0] else {
            panic!("expected an open token, got {:?}", tokens[0]);
        };
        assert_eq!(kind, "ordered_list");
        assert_eq!(attrs.get("start"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn generic_kind_names_are_stable_across_open_and_close() {
        assert_eq!(generic_kind_name("Table([Left, Right])"), "table");
        assert_eq!(generic_kind_name("Table"), "table");
        assert_eq!(generic_kind_name("MetadataBlock(YamlStyle)"), "metadatablock");
    }

    #[test]
    fn block_spans_cover_each_top_level_block() {
        let md = "# one\n\ntwo\n\n---\n\nthree\n";
        let spans = block_spans(md);
        assert_eq!(spans.len(), 4);
        assert!(md[spans[0].clone()].starts_with("# one"));
        assert!(md[spans[2].clone()].starts_with("---"));
    }
}
