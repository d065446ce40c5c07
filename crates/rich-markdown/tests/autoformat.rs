use rich_doc::{Document, Editor, Marks, Node, Point, Selection};
use rich_markdown::{ElementRegistry, autoformat};

fn editor_with(children: Vec<Node>, path: Vec<usize>, offset: usize) -> (Editor, ElementRegistry) {
    let registry = ElementRegistry::standard();
    let doc = Document { children };
    let selection = Selection::collapsed(Point::new(path, offset));
    let editor = Editor::new(doc, selection, registry.schema().clone());
    (editor, registry)
}

#[test]
fn plain_text_is_left_alone() {
    let (mut editor, registry) =
        editor_with(vec![Node::paragraph("just plain words ")], vec![0, 0], 17);
    let before = editor.doc().clone();

    assert!(!autoformat(&mut editor, &registry).unwrap());
    assert_eq!(editor.doc(), &before);
}

#[test]
fn inline_bold_splices_without_touching_siblings() {
    let (mut editor, registry) = editor_with(
        vec![
            Node::paragraph("above"),
            Node::paragraph("this is **bold** text "),
            Node::paragraph("below"),
        ],
        vec![1, 0],
        22,
    );

    assert!(autoformat(&mut editor, &registry).unwrap());

    assert_eq!(editor.doc().children[0], Node::paragraph("above"));
    assert_eq!(editor.doc().children[2], Node::paragraph("below"));

    let block = editor.doc().children[1].as_element().unwrap();
    assert_eq!(block.kind, "paragraph");
    assert_eq!(block.children.len(), 3);
    assert_eq!(block.children[0].as_text().unwrap().text, "this is ");
    let bold_run = block.children[1].as_text().unwrap();
    assert_eq!(bold_run.text, "bold");
    assert!(bold_run.marks.bold);
    assert_eq!(block.children[2].as_text().unwrap().text, " text ");

    // Cursor parked at the end of the spliced run, ready to keep typing.
    assert_eq!(editor.selection().focus.path, vec![1, 2]);
    assert_eq!(editor.selection().focus.offset, 6);
}

#[test]
fn heading_prefix_converts_the_block_and_keeps_cursor_inside() {
    let (mut editor, registry) = editor_with(vec![Node::paragraph("# ")], vec![0, 0], 2);

    assert!(autoformat(&mut editor, &registry).unwrap());

    let block = editor.doc().children[0].as_element().unwrap();
    assert_eq!(block.kind, "heading");
    assert_eq!(block.attr_u64("level"), Some(1));

    // A trailing empty paragraph keeps the document editable past the block.
    assert_eq!(editor.doc().children.len(), 2);
    assert_eq!(editor.doc().children[1], Node::paragraph(""));

    assert_eq!(editor.selection().focus.path, vec![0, 0]);
    assert_eq!(editor.selection().focus.offset, 0);
}

#[test]
fn heading_with_text_keeps_its_words() {
    let (mut editor, registry) = editor_with(vec![Node::paragraph("## Notes ")], vec![0, 0], 9);

    assert!(autoformat(&mut editor, &registry).unwrap());

    let block = editor.doc().children[0].as_element().unwrap();
    assert_eq!(block.kind, "heading");
    assert_eq!(block.attr_u64("level"), Some(2));
    assert_eq!(editor.doc().children[0].text_content(), "Notes");
}

#[test]
fn rule_moves_cursor_past_the_void() {
    let (mut editor, registry) = editor_with(vec![Node::paragraph("--- ")], vec![0, 0], 4);

    assert!(autoformat(&mut editor, &registry).unwrap());

    assert_eq!(editor.doc().children[0].as_element().unwrap().kind, "hr");
    assert_eq!(editor.doc().children[1], Node::paragraph(""));
    assert_eq!(editor.selection().focus.path, vec![1, 0]);
}

#[test]
fn block_construct_mid_line_does_not_fire() {
    let bold = Marks {
        bold: true,
        ..Marks::default()
    };
    let (mut editor, registry) = editor_with(
        vec![Node::element(
            "paragraph",
            rich_doc::Attrs::default(),
            vec![Node::marked_text("x", bold), Node::text(" --- ")],
        )],
        vec![0, 1],
        5,
    );
    let before = editor.doc().clone();

    assert!(!autoformat(&mut editor, &registry).unwrap());
    assert_eq!(editor.doc(), &before);
}

#[test]
fn cursor_away_from_run_end_does_not_fire() {
    let (mut editor, registry) =
        editor_with(vec![Node::paragraph("**bold** here ")], vec![0, 0], 3);
    assert!(!autoformat(&mut editor, &registry).unwrap());
}

#[test]
fn list_prefix_becomes_a_list() {
    let (mut editor, registry) = editor_with(vec![Node::paragraph("- item ")], vec![0, 0], 7);

    assert!(autoformat(&mut editor, &registry).unwrap());

    let block = editor.doc().children[0].as_element().unwrap();
    assert_eq!(block.kind, "bullet_list");
    assert_eq!(editor.doc().children[0].text_content(), "item");
    // Cursor stays inside the list for continued typing.
    assert!(editor.selection().focus.path.starts_with(&[0]));
}
