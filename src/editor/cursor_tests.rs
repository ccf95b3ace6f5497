use super::*;
use crate::dom::NodeId;

fn text_node(editor: &Editor, text: &str) -> NodeId {
    let tree = editor.tree();
    tree.descendants(editor.root())
        .into_iter()
        .find(|node| tree.text(*node) == Some(text))
        .unwrap_or_else(|| panic!("no text node {text:?}"))
}

fn caret(editor: &Editor) -> Option<Boundary> {
    editor.selection().map(|selection| selection.focus)
}

#[test]
fn paragraphs_are_separate_lines() {
    let editor = Editor::from_markup("<p>ab</p><p>c</p>");
    let ab = text_node(&editor, "ab");
    let c = text_node(&editor, "c");

    let stops = editor.caret_stops();

    let positions: Vec<(Boundary, usize)> =
        stops.iter().map(|stop| (stop.boundary, stop.line)).collect();
    assert_eq!(
        positions,
        vec![
            (Boundary::new(ab, 0), 0),
            (Boundary::new(ab, 1), 0),
            (Boundary::new(ab, 2), 0),
            (Boundary::new(c, 0), 1),
            (Boundary::new(c, 1), 1),
        ]
    );
}

#[test]
fn adjacent_inline_text_shares_one_position() {
    let editor = Editor::from_markup("<p>a<b>b</b></p>");
    let a = text_node(&editor, "a");
    let b = text_node(&editor, "b");

    let boundaries: Vec<Boundary> = editor
        .caret_stops()
        .into_iter()
        .map(|stop| stop.boundary)
        .collect();

    assert_eq!(
        boundaries,
        vec![Boundary::new(a, 0), Boundary::new(a, 1), Boundary::new(b, 1)]
    );
}

#[test]
fn line_breaks_start_new_lines() {
    let editor = Editor::from_markup("<p>a<br>b</p>");
    let b = text_node(&editor, "b");

    let stops = editor.caret_stops();

    assert_eq!(stops.len(), 4);
    assert_eq!(stops[2].boundary, Boundary::new(b, 0));
    assert_eq!(stops[2].line, 1);
}

#[test]
fn empty_documents_and_blocks_still_have_a_stop() {
    let empty = Editor::new();
    assert_eq!(
        empty.caret_stops()[0].boundary,
        Boundary::new(empty.root(), 0)
    );

    let editor = Editor::from_markup("<p></p>");
    let paragraph = editor.tree().children(editor.root())[0];
    assert_eq!(editor.caret_stops().len(), 1);
    assert_eq!(editor.caret_stops()[0].boundary, Boundary::new(paragraph, 0));
}

#[test]
fn arrows_move_and_extend_the_selection() {
    let mut editor = Editor::from_markup("<p>abc</p>");
    let abc = text_node(&editor, "abc");

    assert!(editor.move_to_document_start(false));
    assert!(editor.move_right(false));
    assert_eq!(caret(&editor), Some(Boundary::new(abc, 1)));

    assert!(editor.move_right(true));
    assert_eq!(editor.selected_text(), "b");

    assert!(editor.move_left(false));
    assert_eq!(caret(&editor), Some(Boundary::new(abc, 1)));
    assert!(editor.selection().is_some_and(|selection| selection.is_collapsed()));

    assert!(editor.move_left(false));
    assert!(!editor.move_left(false));
}

#[test]
fn line_and_document_moves() {
    let mut editor = Editor::from_markup("<p>ab</p><p>cd</p>");
    let ab = text_node(&editor, "ab");
    let cd = text_node(&editor, "cd");

    editor.move_to_document_start(false);
    assert!(editor.move_to_line_end(false));
    assert_eq!(caret(&editor), Some(Boundary::new(ab, 2)));

    assert!(editor.move_to_document_end(true));
    assert_eq!(caret(&editor), Some(Boundary::new(cd, 2)));
    assert_eq!(editor.selected_text(), "cd");

    assert!(editor.move_to_line_start(false));
    assert_eq!(caret(&editor), Some(Boundary::new(cd, 0)));
}

#[test]
fn caret_position_snaps_to_nearest_stop() {
    let mut editor = Editor::from_markup("<p>ab</p>");
    let ab = text_node(&editor, "ab");
    let paragraph = editor.tree().children(editor.root())[0];

    editor.collapse_to(Boundary::new(paragraph, 0));

    assert_eq!(editor.caret_position(), Some(Boundary::new(ab, 0)));
}

#[test]
fn typing_inserts_at_caret() {
    let mut editor = Editor::from_markup("<p>ab</p>");
    let ab = text_node(&editor, "ab");
    editor.collapse_to(Boundary::new(ab, 1));

    assert!(editor.insert_text("X"));

    assert_eq!(editor.content(), "<p>aXb</p>");
    assert_eq!(caret(&editor), Some(Boundary::new(ab, 2)));
}

#[test]
fn typing_without_selection_appends() {
    let mut editor = Editor::from_markup("<p>ab</p>");
    assert!(editor.insert_text("c"));
    assert_eq!(editor.content(), "<p>abc</p>");

    let mut empty = Editor::new();
    assert!(empty.insert_text("hi"));
    assert_eq!(empty.content(), "hi");
}

#[test]
fn typing_replaces_the_selection() {
    let mut editor = Editor::from_markup("<p>abc</p>");
    let abc = text_node(&editor, "abc");
    editor.set_selection(Boundary::new(abc, 1), Boundary::new(abc, 2));

    assert!(editor.insert_text("X"));

    assert_eq!(editor.content(), "<p>aXc</p>");
}

#[test]
fn backspace_removes_previous_character() {
    let mut editor = Editor::from_markup("<p>abc</p>");
    let abc = text_node(&editor, "abc");
    editor.collapse_to(Boundary::new(abc, 2));

    assert!(editor.delete_backward());

    assert_eq!(editor.content(), "<p>ac</p>");
    assert_eq!(caret(&editor), Some(Boundary::new(abc, 1)));
}

#[test]
fn backspace_at_block_start_merges_paragraphs() {
    let mut editor = Editor::from_markup("<p>ab</p><p>cd</p>");
    let ab = text_node(&editor, "ab");
    let cd = text_node(&editor, "cd");
    editor.collapse_to(Boundary::new(cd, 0));

    assert!(editor.delete_backward());

    assert_eq!(editor.content(), "<p>abcd</p>");
    assert_eq!(caret(&editor), Some(Boundary::new(ab, 2)));
}

#[test]
fn backspace_removes_line_breaks_and_locked_spaces_whole() {
    let mut editor = Editor::from_markup("<p>a<br>b</p>");
    let b = text_node(&editor, "b");
    editor.collapse_to(Boundary::new(b, 0));
    assert!(editor.delete_backward());
    assert_eq!(editor.content(), "<p>ab</p>");

    let mut editor = Editor::from_markup(
        "<p>a<span class=\"locked-space\" contenteditable=\"false\">&nbsp;</span>b</p>",
    );
    let a = text_node(&editor, "a");
    editor.collapse_to(Boundary::new(a, 1));
    assert!(editor.move_right(false));
    assert!(editor.delete_backward());
    assert_eq!(editor.content(), "<p>ab</p>");
}

#[test]
fn backspace_emptying_a_text_node_removes_it() {
    let mut editor = Editor::from_markup("<p>a</p>");
    let a = text_node(&editor, "a");
    editor.collapse_to(Boundary::new(a, 1));

    assert!(editor.delete_backward());

    assert_eq!(editor.content(), "<p></p>");
    let paragraph = editor.tree().children(editor.root())[0];
    assert_eq!(caret(&editor), Some(Boundary::new(paragraph, 0)));
}

#[test]
fn backspace_at_document_start_does_nothing() {
    let mut editor = Editor::from_markup("<p>ab</p>");
    editor.move_to_document_start(false);

    assert!(!editor.delete_backward());
    assert_eq!(editor.content(), "<p>ab</p>");
}
