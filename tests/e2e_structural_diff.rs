//! End-to-end tests for structural comparison of trees.
//!
//! Covers self-equality over random trees, path-qualified reporting of a
//! single changed attribute, the ignored-collection sentinel and reference
//! comparison by name and target identity.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::sample::Index;

use astgraph::testing::{assert_asts_equal, assert_parsing_results_equal};
use astgraph::{
    DataType, DiffOptions, Error, Issue, Metamodel, NamedReference, NodeId, NodeType, ParsingResult,
    PropertyDescriptor, Tree,
};

// ============================================================================
// Helpers
// ============================================================================

fn metamodel() -> Arc<Metamodel> {
    let mut mm = Metamodel::new("shapes");
    mm.register(
        NodeType::new("N")
            .property(PropertyDescriptor::attribute("label", DataType::String))
            .property(PropertyDescriptor::child("single", "N"))
            .property(PropertyDescriptor::children("many", "N"))
            .property(PropertyDescriptor::reference("link", "N")),
    )
    .unwrap();
    Arc::new(mm)
}

/// Node `i` hangs under node `seed % i` and links to node `(seed / 3) % i`.
fn build(shape: &[(usize, bool, String)]) -> (Tree, NodeId) {
    let mut tree = Tree::new(metamodel());
    let root = tree.add_node("N").unwrap();
    let mut nodes = vec![root];
    let mut single_taken = vec![false];
    for (i, (seed, single, label)) in shape.iter().enumerate() {
        let index = i + 1;
        let parent_index = seed % index;
        let parent = nodes[parent_index];
        let node = tree.add_node("N").unwrap();
        tree.set_attribute(node, "label", label.as_str()).unwrap();
        if *single && !single_taken[parent_index] {
            tree.set_child(parent, "single", Some(node)).unwrap();
            single_taken[parent_index] = true;
        } else {
            tree.push_child(parent, "many", node).unwrap();
        }
        let target = nodes[(seed / 3) % index];
        tree.set_reference(node, "link", Some(NamedReference::resolved(label.as_str(), target))).unwrap();
        nodes.push(node);
        single_taken.push(false);
    }
    (tree, root)
}

fn shape_strategy() -> impl Strategy<Value = Vec<(usize, bool, String)>> {
    prop::collection::vec((any::<usize>(), any::<bool>(), "[a-z]{0,4}"), 0..24)
}

/// Differ paths start at `<root>` where tree paths start at `root`.
fn diff_path(tree: &Tree, node: NodeId) -> String {
    tree.path_of(node).replacen("root", "<root>", 1)
}

// ============================================================================
// 1. Random trees
// ============================================================================

proptest! {
    #[test]
    fn test_tree_equals_itself_and_its_rebuild(shape in shape_strategy()) {
        let (tree, root) = build(&shape);
        let (rebuilt, rebuilt_root) = build(&shape);
        prop_assert!(assert_asts_equal(&tree, root, &tree, root, DiffOptions::default()).is_ok());
        prop_assert!(assert_asts_equal(&tree, root, &rebuilt, rebuilt_root, DiffOptions::default()).is_ok());
    }

    #[test]
    fn test_single_changed_label_is_reported_at_its_path(shape in shape_strategy(), pick in any::<Index>()) {
        let (expected, root) = build(&shape);
        let mut actual = expected.clone();
        let changed = NodeId(pick.index(expected.len()));
        actual.set_attribute(changed, "label", "CHANGED").unwrap();

        let err = assert_asts_equal(&expected, root, &actual, root, DiffOptions::default()).unwrap_err();
        match err {
            Error::StructuralMismatch { path, actual, .. } => {
                prop_assert_eq!(path, format!("{}.label", diff_path(&expected, changed)));
                prop_assert!(actual.contains("CHANGED"));
            }
            other => prop_assert!(false, "unexpected error {}", other),
        }
    }
}

// ============================================================================
// 2. Ignored collections
// ============================================================================

#[test]
fn test_ignored_collection_matches_any_list() {
    let (mut expected, root) = build(&[(0, false, "a".into())]);
    let (actual, actual_root) = build(&[(0, false, "x".into()), (0, false, "y".into()), (0, true, "z".into())]);
    expected.ignore_children(root, "many").unwrap();

    // `single` is still compared: expected has none, actual has z.
    let err = assert_asts_equal(&expected, root, &actual, actual_root, DiffOptions::default()).unwrap_err();
    assert!(err.to_string().starts_with("<root>.single: expecting null"), "{err}");

    let (mut expected, root) = build(&[(0, false, "a".into())]);
    let (actual, actual_root) = build(&[(0, false, "x".into()), (0, false, "y".into())]);
    expected.ignore_children(root, "many").unwrap();
    assert_asts_equal(&expected, root, &actual, actual_root, DiffOptions::default()).unwrap();
}

#[test]
fn test_ignored_collection_on_actual_side_is_a_mismatch() {
    let (expected, root) = build(&[]);
    let (mut actual, actual_root) = build(&[]);
    actual.ignore_children(actual_root, "many").unwrap();
    let err = assert_asts_equal(&expected, root, &actual, actual_root, DiffOptions::default()).unwrap_err();
    assert!(err.to_string().starts_with("<root>.many:"), "{err}");
}

// ============================================================================
// 3. References
// ============================================================================

#[test]
fn test_reference_names_and_targets_are_compared() {
    let shape = [(0, false, "a".to_string()), (0, false, "b".to_string())];
    let (expected, root) = build(&shape);

    let (mut renamed, renamed_root) = build(&shape);
    renamed.set_reference(NodeId(2), "link", Some(NamedReference::resolved("other", root))).unwrap();
    let err = assert_asts_equal(&expected, root, &renamed, renamed_root, DiffOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "<root>.many[1].link name: expecting b, actual other");

    let (mut retargeted, retargeted_root) = build(&shape);
    retargeted.resolve_reference(NodeId(2), "link", NodeId(1)).unwrap();
    let err = assert_asts_equal(&expected, root, &retargeted, retargeted_root, DiffOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "<root>.many[1].link referred: expecting N@root, actual N@root.many[0]");

    let (mut unresolved, unresolved_root) = build(&shape);
    unresolved.unresolve_reference(NodeId(2), "link").unwrap();
    let err = assert_asts_equal(&expected, root, &unresolved, unresolved_root, DiffOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "<root>.many[1].link referred: expecting N@root, actual null");
}

#[test]
fn test_named_reference_equality_ignores_unresolved_side() {
    let target = NodeId(7);
    assert_eq!(NamedReference::new("x"), NamedReference::resolved("x", target));
    assert_eq!(NamedReference::resolved("x", target), NamedReference::resolved("x", target));
    assert_ne!(NamedReference::resolved("x", target), NamedReference::resolved("x", NodeId(8)));
    assert_ne!(NamedReference::new("x"), NamedReference::new("y"));
}

// ============================================================================
// 4. Parsing results
// ============================================================================

#[test]
fn test_parsing_results_must_agree_on_issues() {
    let (tree, root) = build(&[(0, false, "a".into())]);
    let clean = ParsingResult::new(tree.clone(), Some(root));
    let noisy = ParsingResult::new(tree, Some(root)).with_issue(Issue::error("missing ';'"));

    assert_parsing_results_equal(&clean, &clean.clone()).unwrap();
    let err = assert_parsing_results_equal(&clean, &noisy).unwrap_err();
    assert!(err.to_string().starts_with("<root>.issues"), "{err}");
}
