use rich_doc::{Attrs, Document, Editor, Marks, Node, Point, Schema, Selection};

fn normalized(children: Vec<Node>) -> Editor {
    let doc = Document { children };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, Schema::standard())
}

#[test]
fn empty_document_gains_a_paragraph() {
    let editor = normalized(vec![]);
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
}

#[test]
fn childless_paragraph_gains_a_text_leaf() {
    let editor = normalized(vec![Node::element(
        "paragraph",
        Attrs::default(),
        vec![],
    )]);
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
}

#[test]
fn adjacent_same_mark_text_leaves_merge() {
    let editor = normalized(vec![Node::element(
        "paragraph",
        Attrs::default(),
        vec![Node::text("hel"), Node::text("lo")],
    )]);
    assert_eq!(editor.doc().children, vec![Node::paragraph("hello")]);
}

#[test]
fn differently_marked_leaves_stay_apart() {
    let bold = Marks {
        bold: true,
        ..Marks::default()
    };
    let editor = normalized(vec![Node::element(
        "paragraph",
        Attrs::default(),
        vec![Node::text("plain "), Node::marked_text("bold", bold)],
    )]);
    let block = editor.doc().children[0].as_element().unwrap();
    assert_eq!(block.children.len(), 2);
}

#[test]
fn stray_empty_text_between_plain_leaves_is_removed() {
    let editor = normalized(vec![Node::element(
        "paragraph",
        Attrs::default(),
        vec![Node::text("a"), Node::text(""), Node::text("b")],
    )]);
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);
}

#[test]
fn placeholder_next_to_inline_void_survives() {
    let para = Node::element(
        "paragraph",
        Attrs::default(),
        vec![
            Node::text(""),
            Node::void("image", Attrs::default()),
            Node::text(""),
        ],
    );
    let editor = normalized(vec![para]);
    let block = editor.doc().children[0].as_element().unwrap();
    assert_eq!(block.children.len(), 3);
}

#[test]
fn selection_clamps_onto_surviving_text() {
    let doc = Document {
        children: vec![Node::paragraph("ok")],
    };
    let selection = Selection::collapsed(Point::new(vec![9, 9], 42));
    let editor = Editor::new(doc, selection, Schema::standard());

    assert_eq!(editor.selection().focus.path, vec![0, 0]);
    assert!(editor.selection().focus.offset <= 2);
}
