use rich_doc::{
    AttrPatch, Document, Node, Op, Point, Selection, apply_op_to,
};

fn doc_with(children: Vec<Node>) -> Document {
    Document { children }
}

fn cursor(path: Vec<usize>, offset: usize) -> Selection {
    Selection::collapsed(Point::new(path, offset))
}

#[test]
fn insert_text_returns_remove_inverse() {
    let mut doc = doc_with(vec![Node::paragraph("held")]);
    let mut sel = cursor(vec![0, 0], 0);

    let inv = apply_op_to(
        &mut doc,
        &mut sel,
        Op::InsertText {
            path: vec![0, 0],
            offset: 2,
            text: "LL".to_string(),
        },
    )
    .unwrap();

    assert_eq!(doc.text_content(), "heLLld");
    assert_eq!(
        inv,
        Op::RemoveText {
            path: vec![0, 0],
            range: 2..4,
        }
    );

    apply_op_to(&mut doc, &mut sel, inv).unwrap();
    assert_eq!(doc.text_content(), "held");
}

#[test]
fn remove_text_inverse_restores_exact_slice() {
    let mut doc = doc_with(vec![Node::paragraph("abcdef")]);
    let mut sel = cursor(vec![0, 0], 0);

    let inv = apply_op_to(
        &mut doc,
        &mut sel,
        Op::RemoveText {
            path: vec![0, 0],
            range: 1..4,
        },
    )
    .unwrap();

    assert_eq!(doc.text_content(), "aef");
    apply_op_to(&mut doc, &mut sel, inv).unwrap();
    assert_eq!(doc.text_content(), "abcdef");
}

#[test]
fn merge_and_split_are_inverses() {
    let mut doc = doc_with(vec![Node::paragraph("left"), Node::paragraph("right")]);
    let mut sel = cursor(vec![1, 0], 2);

    let inv = apply_op_to(&mut doc, &mut sel, Op::MergeNode { path: vec![1] }).unwrap();

    assert_eq!(doc.children.len(), 1);
    let block = doc.children[0].as_element().unwrap();
    assert_eq!(block.children.len(), 2);
    // The cursor followed its text node into the merged block.
    assert_eq!(sel.focus.path, vec![0, 1]);
    assert_eq!(sel.focus.offset, 2);

    assert_eq!(
        inv,
        Op::SplitNode {
            path: vec![0],
            position: 1,
        }
    );
    apply_op_to(&mut doc, &mut sel, inv).unwrap();
    assert_eq!(
        doc.children,
        vec![Node::paragraph("left"), Node::paragraph("right")]
    );
    assert_eq!(sel.focus.path, vec![1, 0]);
    assert_eq!(sel.focus.offset, 2);
}

#[test]
fn split_text_node_moves_cursor_past_split_point() {
    let mut doc = doc_with(vec![Node::paragraph("hello world")]);
    let mut sel = cursor(vec![0, 0], 8);

    let inv = apply_op_to(
        &mut doc,
        &mut sel,
        Op::SplitNode {
            path: vec![0, 0],
            position: 5,
        },
    )
    .unwrap();

    let block = doc.children[0].as_element().unwrap();
    assert_eq!(block.children.len(), 2);
    assert_eq!(block.children[0].text_content(), "hello");
    assert_eq!(block.children[1].text_content(), " world");
    assert_eq!(sel.focus.path, vec![0, 1]);
    assert_eq!(sel.focus.offset, 3);
    assert_eq!(inv, Op::MergeNode { path: vec![0, 1] });
}

#[test]
fn set_node_retype_inverse_restores_kind_and_attrs() {
    let mut attrs = rich_doc::Attrs::default();
    attrs.insert("level".to_string(), serde_json::json!(2));
    let mut doc = doc_with(vec![Node::element(
        "heading",
        attrs,
        vec![Node::text("Title")],
    )]);
    let mut sel = cursor(vec![0, 0], 0);

    let patch = AttrPatch {
        kind: Some("paragraph".to_string()),
        set: rich_doc::Attrs::default(),
        remove: vec!["level".to_string()],
    };
    let inv = apply_op_to(&mut doc, &mut sel, Op::SetNode { path: vec![0], patch }).unwrap();

    let block = doc.children[0].as_element().unwrap();
    assert_eq!(block.kind, "paragraph");
    assert!(block.attrs.is_empty());

    apply_op_to(&mut doc, &mut sel, inv).unwrap();
    let block = doc.children[0].as_element().unwrap();
    assert_eq!(block.kind, "heading");
    assert_eq!(block.attr_u64("level"), Some(2));
}

#[test]
fn remove_node_collapses_selection_to_prior_sibling() {
    let mut doc = doc_with(vec![
        Node::paragraph("one"),
        Node::paragraph("two"),
        Node::paragraph("three"),
    ]);
    let mut sel = cursor(vec![1, 0], 2);

    apply_op_to(&mut doc, &mut sel, Op::RemoveNode { path: vec![1] }).unwrap();

    assert_eq!(doc.children.len(), 2);
    assert_eq!(sel.focus.path, vec![0]);

    // A point after the removed node shifts down by one.
    let mut sel = cursor(vec![1, 0], 1);
    apply_op_to(&mut doc, &mut sel, Op::RemoveNode { path: vec![0] }).unwrap();
    assert_eq!(sel.focus.path, vec![0, 0]);
    assert_eq!(sel.focus.offset, 1);
}

#[test]
fn insert_text_before_cursor_shifts_offset() {
    let mut doc = doc_with(vec![Node::paragraph("abc")]);
    let mut sel = cursor(vec![0, 0], 2);

    apply_op_to(
        &mut doc,
        &mut sel,
        Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "xx".to_string(),
        },
    )
    .unwrap();

    assert_eq!(sel.focus.offset, 4);
}

#[test]
fn out_of_bounds_path_is_an_error() {
    let mut doc = doc_with(vec![Node::paragraph("abc")]);
    let mut sel = cursor(vec![0, 0], 0);

    let err = apply_op_to(&mut doc, &mut sel, Op::RemoveNode { path: vec![5] });
    assert!(err.is_err());
    assert_eq!(doc.children.len(), 1);
}
