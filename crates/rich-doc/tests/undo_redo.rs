use rich_doc::{Document, Editor, Node, Op, Point, Schema, Selection, Transaction};

fn editor_with_text(text: &str) -> Editor {
    let doc = Document {
        children: vec![Node::paragraph(text)],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, Schema::standard())
}

#[test]
fn undo_redo_handles_multi_op_insert_order() {
    let mut editor = editor_with_text("");

    let tx = Transaction::new(vec![
        Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "a".to_string(),
        },
        Op::InsertText {
            path: vec![0, 0],
            offset: 1,
            text: "b".to_string(),
        },
    ])
    .selection_after(Selection::collapsed(Point::new(vec![0, 0], 2)))
    .source("test:multi_insert");

    editor.apply(tx).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);
    assert_eq!(editor.selection().focus.offset, 2);

    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
    assert_eq!(editor.selection().focus.offset, 0);

    assert!(editor.redo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);
    assert_eq!(editor.selection().focus.offset, 2);
}

#[test]
fn undo_restores_structure_after_block_insert() {
    let mut editor = editor_with_text("XYZ");
    let selection_before = editor.selection().clone();

    let tx = Transaction::new(vec![Op::InsertNode {
        path: vec![1],
        node: Node::paragraph("second"),
    }])
    .selection_after(Selection::collapsed(Point::new(vec![1, 0], 0)))
    .source("test:block_insert");

    editor.apply(tx).unwrap();
    assert_eq!(editor.doc().children.len(), 2);

    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("XYZ")]);
    assert_eq!(editor.selection(), &selection_before);
}

#[test]
fn redo_stack_clears_on_new_edit() {
    let mut editor = editor_with_text("");

    let insert = |text: &str, at: usize| {
        Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset: at,
            text: text.to_string(),
        }])
    };

    editor.apply(insert("one", 0)).unwrap();
    assert!(editor.undo());
    assert!(editor.can_redo());

    editor.apply(insert("two", 0)).unwrap();
    assert!(!editor.can_redo());
    assert!(!editor.redo());
    assert_eq!(editor.doc().text_content(), "two");
}

#[test]
fn undo_on_empty_stack_is_a_no_op() {
    let mut editor = editor_with_text("stable");
    assert!(!editor.undo());
    assert_eq!(editor.doc().text_content(), "stable");
}

#[test]
fn dirty_flag_set_by_apply_and_consumed_once() {
    let mut editor = editor_with_text("");
    assert!(!editor.is_dirty());

    editor
        .apply(Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "x".to_string(),
        }]))
        .unwrap();

    assert!(editor.is_dirty());
    assert!(editor.take_dirty());
    assert!(!editor.is_dirty());
}
