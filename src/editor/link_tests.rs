use super::*;
use crate::dom::NodeId;

fn text_node(editor: &Editor, text: &str) -> NodeId {
    let tree = editor.tree();
    tree.descendants(editor.root())
        .into_iter()
        .find(|node| tree.text(*node) == Some(text))
        .unwrap_or_else(|| panic!("no text node {text:?}"))
}

fn initial_text(pending: &PendingLink, key: &str) -> Option<String> {
    pending.request.fields.iter().find_map(|field| match field {
        FieldDescriptor::Text { key: k, initial, .. } if k == key => Some(initial.clone()),
        _ => None,
    })
}

#[test]
fn dialog_request_prefills_selected_text() {
    let mut editor = Editor::from_markup("<p>see the docs</p>");
    let text = text_node(&editor, "see the docs");
    editor.set_selection(Boundary::new(text, 8), Boundary::new(text, 12));

    let pending = editor.begin_link_insertion();

    assert_eq!(pending.request.title, LINK_DIALOG_TITLE);
    let keys: Vec<&str> = pending.request.fields.iter().map(|field| field.key()).collect();
    assert_eq!(keys, vec![LINK_TEXT_FIELD, LINK_URL_FIELD, LINK_NEW_TAB_FIELD]);
    assert_eq!(initial_text(&pending, LINK_TEXT_FIELD).as_deref(), Some("docs"));
    assert_eq!(initial_text(&pending, LINK_URL_FIELD).as_deref(), Some(""));
    assert!(pending.request.fields.iter().any(|field| matches!(
        field,
        FieldDescriptor::Checkbox { default: false, .. }
    )));
}

#[test]
fn confirmed_dialog_inserts_link_at_captured_selection() {
    let mut editor = Editor::from_markup("<p>see the docs</p>");
    let text = text_node(&editor, "see the docs");
    editor.set_selection(Boundary::new(text, 8), Boundary::new(text, 12));
    let pending = editor.begin_link_insertion();

    // Focus moving to the dialog loses the live selection.
    editor.clear_selection();
    let values = DialogValues::new()
        .with_text(LINK_TEXT_FIELD, "docs")
        .with_text(LINK_URL_FIELD, "https://example.com")
        .with_flag(LINK_NEW_TAB_FIELD, false);

    assert!(editor.complete_link_insertion(pending, Some(values)));

    assert_eq!(
        editor.content(),
        "<p>see the <a href=\"https://example.com\">docs</a></p>"
    );
}

#[test]
fn new_tab_flag_adds_target_and_rel() {
    let mut editor = Editor::from_markup("<p>x</p>");
    let text = text_node(&editor, "x");
    editor.collapse_to(Boundary::new(text, 1));
    let pending = editor.begin_link_insertion();
    let values = DialogValues::new()
        .with_text(LINK_TEXT_FIELD, "y")
        .with_text(LINK_URL_FIELD, "/y")
        .with_flag(LINK_NEW_TAB_FIELD, true);

    assert!(editor.complete_link_insertion(pending, Some(values)));

    assert_eq!(
        editor.content(),
        "<p>x<a href=\"/y\" target=\"_blank\" rel=\"noopener noreferrer\">y</a></p>"
    );
}

#[test]
fn new_tab_attributes_follow_the_config() {
    let config = EditorConfig::default()
        .with_link_target("preview")
        .with_link_rel("noopener");
    let mut editor = Editor::with_config(config);
    editor.set_content("<p>x</p>");
    let text = text_node(&editor, "x");
    editor.collapse_to(Boundary::new(text, 1));
    let pending = editor.begin_link_insertion();
    let values = DialogValues::new()
        .with_text(LINK_TEXT_FIELD, "y")
        .with_text(LINK_URL_FIELD, "/y")
        .with_flag(LINK_NEW_TAB_FIELD, true);

    assert!(editor.complete_link_insertion(pending, Some(values)));

    assert_eq!(
        editor.content(),
        "<p>x<a href=\"/y\" target=\"preview\" rel=\"noopener\">y</a></p>"
    );
}

#[test]
fn empty_text_falls_back_to_url() {
    let mut editor = Editor::from_markup("<p>x</p>");
    let text = text_node(&editor, "x");
    editor.collapse_to(Boundary::new(text, 0));
    let pending = editor.begin_link_insertion();
    let values = DialogValues::new()
        .with_text(LINK_TEXT_FIELD, "")
        .with_text(LINK_URL_FIELD, " https://e.com ");

    assert!(editor.complete_link_insertion(pending, Some(values)));

    assert_eq!(
        editor.content(),
        "<p><a href=\"https://e.com\">https://e.com</a>x</p>"
    );
}

#[test]
fn cancelled_dialog_changes_nothing() {
    let mut editor = Editor::from_markup("<p>abc</p>");
    let text = text_node(&editor, "abc");
    editor.set_selection(Boundary::new(text, 0), Boundary::new(text, 3));
    let pending = editor.begin_link_insertion();
    editor.clear_selection();

    assert!(!editor.complete_link_insertion(pending, None));

    assert_eq!(editor.content(), "<p>abc</p>");
    assert!(editor.selection().is_none());
}

#[test]
fn missing_url_changes_nothing() {
    let mut editor = Editor::from_markup("<p>abc</p>");
    let text = text_node(&editor, "abc");
    editor.set_selection(Boundary::new(text, 0), Boundary::new(text, 3));
    let pending = editor.begin_link_insertion();
    let values = DialogValues::new().with_text(LINK_TEXT_FIELD, "abc");

    assert!(!editor.complete_link_insertion(pending, Some(values)));
    assert_eq!(editor.content(), "<p>abc</p>");
}

#[test]
fn dialog_values_distinguish_text_and_flags() {
    let mut values = DialogValues::new().with_flag("a", true);
    values.set("b", FieldValue::Text("t".to_string()));

    assert!(values.flag("a"));
    assert_eq!(values.text("a"), None);
    assert_eq!(values.text("b"), Some("t"));
    assert!(!values.flag("b"));
    assert!(!values.flag("missing"));
}
