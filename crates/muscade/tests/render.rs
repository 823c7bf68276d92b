//! End-to-end pipeline tests: preprocess → template execution → postprocess.

use cannelle::{LoadKind, MapLoader};
use muscade::PageRenderer;
use serde_json::{Map, Value, json};

fn data(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("test data must be an object"),
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn theme_loader() -> MapLoader {
    MapLoader::new()
        .insert(
            LoadKind::Layout,
            "base",
            concat!(
                r#"{{ define "title" }}Site{{ end }}"#,
                r#"{{ define "layout" }}"#,
                "<!DOCTYPE html><html><head><title>{{ render \"title\" }}</title></head>",
                "<body>{{ page_content }}</body></html>",
                r#"{{ end }}"#,
            ),
        )
        .insert(
            LoadKind::Import,
            "components",
            concat!(
                r#"{{ define "macro:Card" }}"#,
                r#"<div class="card"><h2>{{ .title }}</h2>{{ .content }}</div>"#,
                r#"{{ end }}"#,
            ),
        )
        .insert(
            LoadKind::Include,
            "sidebar",
            r#"{{ define "sidebar" }}<aside>{{ .user }}</aside>{{ end }}"#,
        )
}

fn renderer() -> PageRenderer {
    init_logging();
    PageRenderer::new("test-theme", theme_loader()).with_imports(["components"])
}

#[test]
fn test_html_page_with_macro() {
    let html = renderer()
        .render(
            "base",
            r#"<Card title="Intro"><p>Hello</p></Card>"#,
            Map::new(),
            false,
        )
        .unwrap();

    assert_eq!(
        html,
        concat!(
            "<!DOCTYPE html><html><head><title>Site</title></head>",
            r#"<body><div class="card"><h2>Intro</h2><p>Hello</p></div></body></html>"#,
        )
    );
}

#[test]
fn test_macro_name_never_reaches_output() {
    let html = renderer()
        .render("base", "<Card title=\"x\">y</Card>", Map::new(), false)
        .unwrap();
    assert!(!html.contains("<Card"));
    assert!(!html.contains("Card__"));
}

#[test]
fn test_markdown_page() {
    let html = renderer()
        .render("base", "# Heading\n\nSome *emphasis* here.", Map::new(), true)
        .unwrap();

    assert!(html.contains("<h1>Heading</h1>"));
    assert!(html.contains("<em>emphasis</em>"));
    assert!(html.contains("<!DOCTYPE html>"));
}

#[test]
fn test_content_block_overrides_layout_default() {
    let content = concat!(
        r#"{{ define "title" }}Custom{{ end }}"#,
        r#"{{ define "page_content" }}<p>body</p>{{ end }}"#,
    );
    let html = renderer().render("base", content, Map::new(), false).unwrap();

    assert!(html.contains("<title>Custom</title>"));
    assert!(html.contains("<p>body</p>"));
}

#[test]
fn test_page_data_reaches_templates() {
    let html = renderer()
        .render(
            "base",
            "<p>By {{ .author }}</p>",
            data(json!({"author": "mira"})),
            false,
        )
        .unwrap();
    assert!(html.contains("<p>By mira</p>"));
}

#[test]
fn test_includes_render_against_page_data() {
    let loader = theme_loader().insert(
        LoadKind::Layout,
        "with-sidebar",
        concat!(
            r#"{{ define "layout" }}"#,
            "<body>{{ includes .sidebars }}{{ page_content }}</body>",
            r#"{{ end }}"#,
        ),
    );
    let renderer = PageRenderer::new("test-theme", loader);

    let html = renderer
        .render(
            "with-sidebar",
            "<p>main</p>",
            data(json!({"user": "ada", "sidebars": ["sidebar"]})),
            false,
        )
        .unwrap();

    assert!(html.contains("<aside>ada</aside>"));
    assert!(html.contains("<p>main</p>"));
}

#[test]
fn test_blockquote_details_folded() {
    let content = concat!(
        "<blockquote><p>x</p>",
        "<details><summary>s</summary></details>",
        "<p>y</p></blockquote>",
    );
    let html = renderer().render("base", content, Map::new(), false).unwrap();

    assert!(html.contains(
        "<blockquote><details><summary>s</summary><p>x</p><p>y</p></details></blockquote>"
    ));
}

#[test]
fn test_comments_stripped_from_output() {
    let html = renderer()
        .render("base", "<p>keep</p><!-- drop -->", Map::new(), false)
        .unwrap();
    assert!(!html.contains("drop"));
    assert!(html.contains("<p>keep</p>"));
}

#[test]
fn test_nested_macros() {
    let loader = theme_loader().insert(
        LoadKind::Import,
        "badges",
        r#"{{ define "macro:Badge" }}<span class="badge">{{ .content }}</span>{{ end }}"#,
    );
    let renderer =
        PageRenderer::new("test-theme", loader).with_imports(["components", "badges"]);

    let html = renderer
        .render(
            "base",
            r#"<Card title="t"><Badge>new</Badge></Card>"#,
            Map::new(),
            false,
        )
        .unwrap();

    assert!(html.contains(r#"<div class="card"><h2>t</h2><span class="badge">new</span></div>"#));
}

#[test]
fn test_missing_layout_is_error() {
    let err = renderer()
        .render("missing", "<p>x</p>", Map::new(), false)
        .unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("render template"), "got: {message}");
}

#[test]
fn test_undefined_macro_block_is_error() {
    // UnknownWidget has no macro:UnknownWidget implementation block.
    let err = renderer()
        .render("base", "<UnknownWidget>x</UnknownWidget>", Map::new(), false)
        .unwrap_err();
    let message = format!("{err:?}");
    assert!(message.contains("UnknownWidget"), "got: {message}");
}

#[test]
fn test_render_twice_is_stable() {
    // Rendering the same page twice through fresh pipelines is identical:
    // no state leaks between renders.
    let content = r#"<Card title="a">one</Card><Card title="b">two</Card>"#;
    let first = renderer().render("base", content, Map::new(), false).unwrap();
    let second = renderer().render("base", content, Map::new(), false).unwrap();
    assert_eq!(first, second);
}
