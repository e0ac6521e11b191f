use sapling_tree::{Node, Tree};

/// The strategy used to remove branches that test unimportant features.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PrunerKind {
	/// Collapse every branch on an unimportant feature, along with everything below it.
	Complete,
	/// Only collapse branches on an unimportant feature whose children are all leaves, so a single pass removes at most one level.
	Selective,
}

impl Default for PrunerKind {
	fn default() -> Self {
		PrunerKind::Complete
	}
}

impl PrunerKind {
	/// Run one pruning pass over `tree`. Return the number of branches collapsed.
	pub fn prune(&self, tree: &mut Tree, is_prunable: &dyn Fn(&str) -> bool) -> usize {
		let indices = match self {
			PrunerKind::Complete => complete_candidates(tree, is_prunable),
			PrunerKind::Selective => selective_candidates(tree, is_prunable),
		};
		let n_collapsed = tree.collapse(&indices);
		if n_collapsed > 0 {
			log::debug!(
				"{:?} pruning collapsed {} branches, {} nodes remain",
				self,
				n_collapsed,
				tree.n_nodes()
			);
		}
		n_collapsed
	}
}

/// A feature is prunable when its importance is strictly below the threshold. A feature whose importance equals the threshold is important.
pub fn is_prunable(importance: f64, threshold: f64) -> bool {
	importance < threshold
}

/// Visit the tree in preorder, stopping at the first prunable branch on each path.
fn complete_candidates(tree: &Tree, is_prunable: &dyn Fn(&str) -> bool) -> Vec<usize> {
	let mut indices = Vec::new();
	let mut stack = vec![0];
	while let Some(node_index) = stack.pop() {
		if let Some(Node::Branch(branch)) = tree.node(node_index) {
			if is_prunable(branch.split.feature()) {
				indices.push(node_index);
			} else {
				stack.extend(branch.children.iter().rev());
			}
		}
	}
	indices
}

/// The candidates are judged against the shape of the tree before any of them is collapsed.
fn selective_candidates(tree: &Tree, is_prunable: &dyn Fn(&str) -> bool) -> Vec<usize> {
	tree.nodes()
		.iter()
		.enumerate()
		.filter_map(|(node_index, node)| {
			let branch = node.as_branch()?;
			let children_are_leaves = branch
				.children
				.iter()
				.all(|child| matches!(tree.node(*child), Some(Node::Leaf(_))));
			if children_are_leaves && is_prunable(branch.split.feature()) {
				Some(node_index)
			} else {
				None
			}
		})
		.collect()
}
