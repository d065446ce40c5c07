use serde_json::json;

use rich_doc::{Attrs, Node};
use rich_markdown::{ElementRegistry, parse_markdown, serialize_nodes};

fn image_doc(attrs: Attrs) -> Vec<Node> {
    vec![Node::element(
        "paragraph",
        Attrs::default(),
        vec![Node::void("image", attrs)],
    )]
}

#[test]
fn plain_image_uses_compact_form() {
    let registry = ElementRegistry::standard();
    let mut attrs = Attrs::default();
    attrs.insert("src".to_string(), json!("pic.png"));
    attrs.insert("alt".to_string(), json!("a pic"));
    assert_eq!(
        serialize_nodes(&image_doc(attrs), &registry),
        "![a pic](pic.png)\n"
    );
}

#[test]
fn image_with_title_keeps_compact_form() {
    let registry = ElementRegistry::standard();
    let mut attrs = Attrs::default();
    attrs.insert("src".to_string(), json!("pic.png"));
    attrs.insert("alt".to_string(), json!("a"));
    attrs.insert("title".to_string(), json!("hover"));
    assert_eq!(
        serialize_nodes(&image_doc(attrs), &registry),
        "![a](pic.png \"hover\")\n"
    );
}

#[test]
fn width_forces_html_img_fallback() {
    let registry = ElementRegistry::standard();
    let mut attrs = Attrs::default();
    attrs.insert("src".to_string(), json!("pic.png"));
    attrs.insert("alt".to_string(), json!("a"));
    attrs.insert("width".to_string(), json!(100));

    let out = serialize_nodes(&image_doc(attrs), &registry);
    assert_eq!(
        out,
        "<img src=\"pic.png\" alt=\"a\" width=\"100\" style=\"object-fit:cover\"/>\n"
    );
    assert!(!out.contains("!["));
}

#[test]
fn whitespace_in_src_forces_html_img_fallback() {
    let registry = ElementRegistry::standard();
    let mut attrs = Attrs::default();
    attrs.insert("src".to_string(), json!("my pic.png"));
    let out = serialize_nodes(&image_doc(attrs), &registry);
    assert!(out.starts_with("<img src=\"my pic.png\""));
}

#[test]
fn html_img_round_trips_with_dimensions() {
    let registry = ElementRegistry::standard();
    let mut attrs = Attrs::default();
    attrs.insert("src".to_string(), json!("pic.png"));
    attrs.insert("alt".to_string(), json!("a"));
    attrs.insert("width".to_string(), json!(100));
    attrs.insert("height".to_string(), json!(40));
    let tree = image_doc(attrs);

    let out = serialize_nodes(&tree, &registry);
    let reparsed = parse_markdown(&out, &registry);
    assert_eq!(reparsed, tree);
}

#[test]
fn compact_image_round_trips() {
    let registry = ElementRegistry::standard();
    let tree = parse_markdown("![alt](img.png \"t\")\n", &registry);
    let image = tree[0].as_element().unwrap().children[0]
        .as_element()
        .unwrap();
    assert_eq!(image.kind, "image");
    assert_eq!(image.attr_str("src"), Some("img.png"));
    assert_eq!(image.attr_str("alt"), Some("alt"));
    assert_eq!(image.attr_str("title"), Some("t"));

    let out = serialize_nodes(&tree, &registry);
    assert_eq!(out, "![alt](img.png \"t\")\n");
}
