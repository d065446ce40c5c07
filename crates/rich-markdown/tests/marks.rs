use rich_doc::{Attrs, Marks, Node};
use rich_markdown::{ElementRegistry, parse_markdown, serialize_nodes};

fn paragraph_of(children: Vec<Node>) -> Vec<Node> {
    vec![Node::element("paragraph", Attrs::default(), children)]
}

#[test]
fn bold_italic_always_nests_bold_outermost() {
    let registry = ElementRegistry::standard();
    let marks = Marks {
        bold: true,
        italic: true,
        ..Marks::default()
    };
    let tree = paragraph_of(vec![Node::marked_text("text", marks)]);
    assert_eq!(serialize_nodes(&tree, &registry), "**_text_**\n");
}

#[test]
fn full_mark_stack_nests_deterministically() {
    let registry = ElementRegistry::standard();
    let marks = Marks {
        bold: true,
        italic: true,
        underline: true,
        strikethrough: true,
        code: false,
    };
    let tree = paragraph_of(vec![Node::marked_text("x", marks)]);
    assert_eq!(serialize_nodes(&tree, &registry), "**_<u>~~x~~</u>_**\n");
}

#[test]
fn code_mark_skips_escaping() {
    let registry = ElementRegistry::standard();
    let marks = Marks {
        code: true,
        ..Marks::default()
    };
    let tree = paragraph_of(vec![Node::marked_text("a * b_c", marks)]);
    assert_eq!(serialize_nodes(&tree, &registry), "`a * b_c`\n");
}

#[test]
fn whitespace_stays_outside_delimiters() {
    let registry = ElementRegistry::standard();
    let bold = Marks {
        bold: true,
        ..Marks::default()
    };
    let tree = paragraph_of(vec![
        Node::text("a"),
        Node::marked_text(" b ", bold),
        Node::text("c"),
    ]);
    assert_eq!(serialize_nodes(&tree, &registry), "a **b** c\n");
}

#[test]
fn parsed_nested_emphasis_collapses_to_one_marked_run() {
    let registry = ElementRegistry::standard();
    let tree = parse_markdown("**_both_**\n", &registry);
    let block = tree[0].as_element().unwrap();
    assert_eq!(block.children.len(), 1);
    let run = block.children[0].as_text().unwrap();
    assert_eq!(run.text, "both");
    assert!(run.marks.bold && run.marks.italic);
    assert!(!run.marks.underline && !run.marks.strikethrough && !run.marks.code);
}

#[test]
fn underline_html_toggles_the_mark() {
    let registry = ElementRegistry::standard();
    let tree = parse_markdown("<u>under</u> rest\n", &registry);
    let block = tree[0].as_element().unwrap();
    let first = block.children[0].as_text().unwrap();
    assert_eq!(first.text, "under");
    assert!(first.marks.underline);
    let second = block.children[1].as_text().unwrap();
    assert_eq!(second.text, " rest");
    assert!(!second.marks.underline);
}
