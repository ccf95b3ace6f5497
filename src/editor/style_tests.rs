use super::*;
use crate::dom::{NodeId, Tree};

fn first_text(tree: &Tree) -> NodeId {
    tree.descendants(tree.root())
        .into_iter()
        .find(|node| tree.is_text(*node))
        .expect("document has text")
}

fn element(tree: &Tree, name: &str) -> NodeId {
    tree.descendants(tree.root())
        .into_iter()
        .find(|node| tree.is_element_named(*node, name))
        .unwrap_or_else(|| panic!("no <{name}> element"))
}

#[test]
fn context_collects_every_enclosing_category() {
    let editor = Editor::from_markup("<blockquote><p><b><i>x</i></b></p></blockquote>");
    let tree = editor.tree();

    let context = resolve_style_context(tree, first_text(tree), tree.root());

    assert!(context.is_active(StyleCategory::Bold));
    assert!(context.is_active(StyleCategory::Italic));
    assert!(context.is_active(StyleCategory::Quote));
    assert!(!context.is_active(StyleCategory::Underline));
    assert!(!context.is_active(StyleCategory::Strikethrough));
}

#[test]
fn walk_stops_at_the_boundary_node() {
    let editor = Editor::from_markup("<b><i>x</i></b>");
    let tree = editor.tree();
    let bold = element(tree, "b");

    let context = resolve_style_context(tree, first_text(tree), bold);

    assert_eq!(context.active(), vec![StyleCategory::Italic]);
}

#[test]
fn starting_element_counts_itself() {
    let editor = Editor::from_markup("<p><u>x</u></p>");
    let tree = editor.tree();

    let context = resolve_style_context(tree, element(tree, "u"), tree.root());

    assert_eq!(context.active(), vec![StyleCategory::Underline]);
}

#[test]
fn synonyms_map_to_the_same_category() {
    let editor = Editor::from_markup("<strong><em><del><q>x</q></del></em></strong>");
    let tree = editor.tree();

    let context = resolve_style_context(tree, first_text(tree), tree.root());

    assert_eq!(
        context,
        StyleContext::from_categories(&[
            StyleCategory::Bold,
            StyleCategory::Italic,
            StyleCategory::Strikethrough,
            StyleCategory::Quote,
        ])
    );
}

#[test]
fn missing_boundary_walks_to_the_root() {
    let editor = Editor::from_markup("<p><b>x</b></p><p><i>y</i></p>");
    let tree = editor.tree();
    let unrelated = element(tree, "i");

    let context = resolve_style_context(tree, first_text(tree), unrelated);

    assert_eq!(context.active(), vec![StyleCategory::Bold]);
}

#[test]
fn plain_text_has_empty_context() {
    let editor = Editor::from_markup("<p><span>x</span></p>");
    let tree = editor.tree();

    assert!(resolve_style_context(tree, first_text(tree), tree.root()).is_empty());
}

#[test]
fn selection_context_reports_labels_in_fixed_order() {
    let mut editor = Editor::from_markup("<blockquote><i><b>quoted</b></i></blockquote>");
    assert!(editor.style_context_at_selection().is_empty());

    let text = first_text(editor.tree());
    editor.collapse_to(Boundary::new(text, 2));

    assert_eq!(
        editor.style_context_at_selection().labels(),
        vec!["Bold", "Italic", "Quote"]
    );
}

#[test]
fn context_builders_accumulate() {
    let mut context = StyleContext::new().with(StyleCategory::Underline);
    context.activate(StyleCategory::Bold);

    assert_eq!(
        context.active(),
        vec![StyleCategory::Bold, StyleCategory::Underline]
    );
    assert_eq!(StyleCategory::from_tag("strike"), Some(StyleCategory::Strikethrough));
    assert_eq!(StyleCategory::from_tag("span"), None);
    assert_eq!(StyleCategory::Quote.canonical_tag(), "blockquote");
}
