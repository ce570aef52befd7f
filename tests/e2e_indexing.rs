//! End-to-end tests for traversal order and identity assignment.
//!
//! Random trees come from a compact "shape" description: node `i` (i > 0)
//! hangs under node `seed % i`, in its single slot when asked and free,
//! otherwise appended to its list slot.

use std::sync::Arc;

use hashbrown::HashSet;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use astgraph::index::DEFAULT_NAMESPACE;
use astgraph::walk::Walker;
use astgraph::{
    compute_ids, walk_children, walk_leaves_first, walk_pre_order, DataType, Error, IdProvider, Metamodel, NodeId,
    NodeType, PropertyDescriptor, SequentialIdProvider, StructuralIdProvider, Tree,
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
        nodes.push(node);
        single_taken.push(false);
    }
    (tree, root)
}

fn shape_strategy() -> impl Strategy<Value = Vec<(usize, bool, String)>> {
    prop::collection::vec((any::<usize>(), any::<bool>(), "[a-z]{0,4}"), 0..32)
}

fn descendants(tree: &Tree, node: NodeId) -> HashSet<NodeId> {
    walk_pre_order(tree, node).filter(|n| *n != node).collect()
}

// ============================================================================
// 1. Walk order
// ============================================================================

proptest! {
    #[test]
    fn test_walks_visit_every_node_once(shape in shape_strategy()) {
        let (tree, root) = build(&shape);
        let pre: Vec<NodeId> = walk_pre_order(&tree, root).collect();
        let post: Vec<NodeId> = walk_leaves_first(&tree, root).collect();
        prop_assert_eq!(pre.len(), tree.len());
        prop_assert_eq!(post.len(), tree.len());
        prop_assert_eq!(pre.iter().collect::<HashSet<_>>(), post.iter().collect::<HashSet<_>>());
        prop_assert_eq!(pre.first(), Some(&root));
        prop_assert_eq!(post.last(), Some(&root));
    }

    #[test]
    fn test_leaves_first_yields_descendants_before_ancestors(shape in shape_strategy()) {
        let (tree, root) = build(&shape);
        let post: Vec<NodeId> = walk_leaves_first(&tree, root).collect();
        for (position, node) in post.iter().enumerate() {
            let earlier: HashSet<NodeId> = post[..position].iter().copied().collect();
            prop_assert!(descendants(&tree, *node).is_subset(&earlier));
        }
    }

    #[test]
    fn test_pre_order_children_follow_declaration_order(shape in shape_strategy()) {
        let (tree, root) = build(&shape);
        let pre: Vec<NodeId> = walk_pre_order(&tree, root).collect();
        for node in &pre {
            let positions: Vec<usize> = walk_children(&tree, *node)
                .map(|c| pre.iter().position(|p| p == &c).unwrap())
                .collect();
            let mut sorted = positions.clone();
            sorted.sort_unstable();
            prop_assert_eq!(positions, sorted);
        }
    }

    #[test]
    fn test_compute_ids_is_total_and_deterministic(shape in shape_strategy()) {
        let (tree, root) = build(&shape);
        let first = compute_ids(&tree, root, walk_pre_order, &mut SequentialIdProvider::new()).unwrap();
        let second = compute_ids(&tree, root, walk_pre_order, &mut SequentialIdProvider::new()).unwrap();
        prop_assert_eq!(first.len(), tree.len());
        prop_assert_eq!(first.iter().collect::<Vec<_>>(), second.iter().collect::<Vec<_>>());

        let structural = compute_ids(&tree, root, walk_leaves_first, &mut StructuralIdProvider::default()).unwrap();
        prop_assert_eq!(structural.len(), tree.len());
        let root_id = format!("{DEFAULT_NAMESPACE}-root");
        prop_assert_eq!(structural.get(root), Some(root_id.as_str()));
    }
}

// ============================================================================
// 2. Identity assignment
// ============================================================================

#[test]
fn test_walk_order_decides_id_order() {
    let (tree, root) = build(&[(0, true, "a".into()), (0, false, "b".into()), (1, false, "c".into())]);

    let pre = compute_ids(&tree, root, walk_pre_order, &mut SequentialIdProvider::new()).unwrap();
    let post = compute_ids(&tree, root, walk_leaves_first, &mut SequentialIdProvider::new()).unwrap();

    assert_eq!(pre.get(root), Some("0"));
    assert_eq!(post.get(root), Some("3"));
    assert_eq!(
        pre.iter().map(|(n, _)| n).collect::<Vec<_>>(),
        walk_pre_order(&tree, root).collect::<Vec<_>>()
    );
    assert_eq!(
        post.iter().map(|(n, _)| n).collect::<Vec<_>>(),
        Walker::LeavesFirst.walk(&tree, root).collect::<Vec<_>>()
    );
}

/// root -> child -> (first, second), numbered by a counting closure.
#[test]
fn test_custom_ids_on_two_level_tree() {
    let mut tree = Tree::new(metamodel());
    let root = tree.add_node("N").unwrap();
    let child = tree.add_node("N").unwrap();
    let first = tree.add_node("N").unwrap();
    let second = tree.add_node("N").unwrap();
    tree.push_child(root, "many", child).unwrap();
    tree.push_child(child, "many", first).unwrap();
    tree.push_child(child, "many", second).unwrap();

    let counting = || {
        let mut n = 0;
        move |_: &Tree, _: NodeId| {
            let id = format!("custom_{n}");
            n += 1;
            Some(id)
        }
    };

    let pre = compute_ids(&tree, root, walk_pre_order, &mut counting()).unwrap();
    assert_eq!(
        [root, child, first, second].map(|n| pre.get(n)),
        [Some("custom_0"), Some("custom_1"), Some("custom_2"), Some("custom_3")]
    );

    let post = compute_ids(&tree, root, walk_leaves_first, &mut counting()).unwrap();
    assert_eq!(
        [first, second, child, root].map(|n| post.get(n)),
        [Some("custom_0"), Some("custom_1"), Some("custom_2"), Some("custom_3")]
    );
}

#[test]
fn test_provider_can_skip_nodes() {
    let (tree, root) = build(&[(0, false, "keep".into()), (0, false, "".into())]);
    let mut labelled = |tree: &Tree, node: NodeId| -> Option<String> {
        match tree.attribute(node, "label").ok()?.as_str()? {
            "" => None,
            label => Some(label.to_string()),
        }
    };

    let ids = compute_ids(&tree, root, walk_pre_order, &mut labelled).unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids.node("keep").map(|n| tree.describe(n)), Some("N@root.many[0]".to_string()));
}

#[test]
fn test_colliding_ids_are_rejected() {
    let (tree, root) = build(&[(0, false, "x".into())]);
    let mut constant = |_: &Tree, _: NodeId| Some("same".to_string());
    let err = compute_ids(&tree, root, walk_pre_order, &mut constant).unwrap_err();
    assert!(matches!(err, Error::DuplicateId { ref id, .. } if id == "same"), "{err}");
}

#[test]
fn test_structural_ids_follow_containment_paths() {
    let (tree, root) = build(&[(0, true, "a".into()), (0, false, "b".into()), (2, false, "c".into())]);
    let mut provider = StructuralIdProvider::new("src/main.calc");
    let ids = compute_ids(&tree, root, walk_pre_order, &mut provider).unwrap();

    let mut rendered: Vec<&str> = ids.iter().map(|(_, id)| id).collect();
    rendered.sort_unstable();
    assert_eq!(
        rendered,
        vec![
            "src_main_calc-root",
            "src_main_calc-root_many_0",
            "src_main_calc-root_many_0_many_0",
            "src_main_calc-root_single",
        ]
    );
}

#[test]
fn test_boxed_provider_is_usable() {
    let (tree, root) = build(&[(0, false, "x".into())]);
    let mut provider: Box<dyn IdProvider> = Box::new(SequentialIdProvider::starting_at(10));
    let ids = compute_ids(&tree, root, walk_pre_order, provider.as_mut()).unwrap();
    assert_eq!(ids.get(root), Some("10"));
}
