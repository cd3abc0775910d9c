//! Cost-complexity (weakest-link) pruning.
//!
//! One post-order pass: each split compares its own resubstitution cost
//! `R(t) = impurity × samples` with the summed cost of the leaves below it,
//! and collapses when the per-leaf saving `g(t) = (R(t) - R(T_t)) / (|T_t| - 1)`
//! does not exceed `ccp_alpha`.

use tracing::debug;

use crate::node::{Node, NodeIndex};

/// Prune the tree rooted at index 0 in place and compact the arena.
///
/// Returns the number of splits that were collapsed.
pub(crate) fn prune<V: Clone>(nodes: &mut Vec<Node<V>>, ccp_alpha: f64) -> usize {
    if nodes.is_empty() {
        return 0;
    }
    let mut collapsed = 0usize;
    prune_node(nodes, 0, ccp_alpha, &mut collapsed);
    if collapsed > 0 {
        compact(nodes);
    }
    debug!(collapsed, n_nodes = nodes.len(), ccp_alpha, "tree pruned");
    collapsed
}

/// Returns `(R(T_t), |T_t|)` for the subtree at `idx` after pruning it.
fn prune_node<V: Clone>(
    nodes: &mut [Node<V>],
    idx: usize,
    ccp_alpha: f64,
    collapsed: &mut usize,
) -> (f64, usize) {
    let (left, right) = match &nodes[idx] {
        Node::Leaf {
            impurity,
            n_samples,
            ..
        } => return (impurity.value() * *n_samples as f64, 1),
        Node::Split { left, right, .. } => (left.index(), right.index()),
    };

    let (left_cost, left_leaves) = prune_node(nodes, left, ccp_alpha, collapsed);
    let (right_cost, right_leaves) = prune_node(nodes, right, ccp_alpha, collapsed);
    let subtree_cost = left_cost + right_cost;
    let subtree_leaves = left_leaves + right_leaves;

    if subtree_leaves <= 1 {
        return (subtree_cost, subtree_leaves);
    }

    let node = &mut nodes[idx];
    let node_cost = node.impurity().value() * node.n_samples() as f64;
    let effective_alpha = (node_cost - subtree_cost) / (subtree_leaves - 1) as f64;
    if effective_alpha <= ccp_alpha {
        node.collapse();
        *collapsed += 1;
        (node_cost, 1)
    } else {
        (subtree_cost, subtree_leaves)
    }
}

/// Drop unreachable nodes, renumbering the rest in preorder.
pub(crate) fn compact<V: Clone>(nodes: &mut Vec<Node<V>>) {
    let mut kept: Vec<Node<V>> = Vec::with_capacity(nodes.len());
    copy_subtree(nodes, 0, &mut kept);
    *nodes = kept;
}

fn copy_subtree<V: Clone>(nodes: &[Node<V>], idx: usize, out: &mut Vec<Node<V>>) -> NodeIndex {
    let new_idx = out.len();
    out.push(nodes[idx].clone());
    if let Node::Split { left, right, .. } = &nodes[idx] {
        let new_left = copy_subtree(nodes, left.index(), out);
        let new_right = copy_subtree(nodes, right.index(), out);
        if let Node::Split { left, right, .. } = &mut out[new_idx] {
            *left = new_left;
            *right = new_right;
        }
    }
    NodeIndex::new(new_idx)
}
