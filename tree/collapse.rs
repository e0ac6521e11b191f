use crate::{
	features::{add_class_counts, ClassCounts},
	LeafNode, Node, Tree,
};

impl Tree {
	/// Replace each branch at `indices` with a leaf whose class counts are the sum of the class counts of every leaf below it. The new leaves start with empty statistics. Indices that are not reachable branches are ignored, including branches below one collapsed earlier in the same call. Afterward the arena is compacted into preorder, so indices from before the call are no longer valid. Return the number of branches collapsed.
	pub fn collapse(&mut self, indices: &[usize]) -> usize {
		let parents = self.parents();
		let mut n_collapsed = 0;
		for &index in indices {
			if !self.is_reachable(index, &parents) {
				continue;
			}
			let depth = match self.nodes().get(index) {
				Some(Node::Branch(branch)) => branch.depth,
				_ => continue,
			};
			let class_counts = self.subtree_class_counts(index);
			self.nodes_mut()[index] = Node::Leaf(LeafNode::new(class_counts, depth));
			n_collapsed += 1;
		}
		if n_collapsed > 0 {
			self.compact();
		}
		n_collapsed
	}

	/// Map each node reachable from the root to the index of its parent.
	fn parents(&self) -> Vec<Option<usize>> {
		let mut parents = vec![None; self.n_nodes()];
		let mut stack = vec![0];
		while let Some(node_index) = stack.pop() {
			if let Some(Node::Branch(branch)) = self.nodes().get(node_index) {
				for child in branch.children.iter() {
					if let Some(parent) = parents.get_mut(*child) {
						*parent = Some(node_index);
						stack.push(*child);
					}
				}
			}
		}
		parents
	}

	/// A node is reachable if the path to it from the root passes only through branches. A node below a branch that was just collapsed is not.
	fn is_reachable(&self, index: usize, parents: &[Option<usize>]) -> bool {
		let mut node_index = index;
		while let Some(Some(parent)) = parents.get(node_index) {
			if let Some(Node::Leaf(_)) = self.nodes().get(*parent) {
				return false;
			}
			node_index = *parent;
		}
		node_index == 0
	}

	/// Return the sum of the class counts of every leaf in the subtree rooted at `index`.
	pub fn subtree_class_counts(&self, index: usize) -> ClassCounts {
		let mut class_counts = ClassCounts::new();
		let mut stack = vec![index];
		while let Some(node_index) = stack.pop() {
			match self.nodes().get(node_index) {
				Some(Node::Branch(branch)) => stack.extend(branch.children.iter()),
				Some(Node::Leaf(leaf)) => add_class_counts(&mut class_counts, &leaf.class_counts),
				None => {}
			}
		}
		class_counts
	}

	/// Rebuild the arena with only the nodes reachable from the root, in preorder, so every subtree occupies a contiguous range of indexes.
	fn compact(&mut self) {
		let mut old_nodes: Vec<Option<Node>> = self.nodes_mut().drain(..).map(Some).collect();
		let mut new_nodes: Vec<Node> = Vec::with_capacity(old_nodes.len());
		// Each entry is an old index and, if it is not the root, the new index of its parent and its position among the parent's children.
		let mut stack: Vec<(usize, Option<(usize, usize)>)> = vec![(0, None)];
		while let Some((old_index, parent)) = stack.pop() {
			let node = match old_nodes.get_mut(old_index).and_then(Option::take) {
				Some(node) => node,
				None => continue,
			};
			let new_index = new_nodes.len();
			if let Some((parent_index, position)) = parent {
				if let Some(Node::Branch(parent)) = new_nodes.get_mut(parent_index) {
					parent.children[position] = new_index;
				}
			}
			if let Node::Branch(branch) = &node {
				for (position, child) in branch.children.iter().enumerate().rev() {
					stack.push((*child, Some((new_index, position))));
				}
			}
			new_nodes.push(node);
		}
		*self.nodes_mut() = new_nodes;
	}
}

#[cfg(test)]
mod test {
	use crate::{
		BranchNode, BranchSplit, BranchSplitContinuous, LeafNode, Node, Tree, TreeOptions,
	};
	use insta::assert_snapshot;

	fn leaf(class_counts: &[(&str, f64)], depth: usize) -> Node {
		Node::Leaf(LeafNode::new(
			class_counts
				.iter()
				.map(|(class, count)| ((*class).to_owned(), *count))
				.collect(),
			depth,
		))
	}

	fn continuous(feature: &str, children: Vec<usize>, depth: usize) -> Node {
		let n_children = children.len();
		Node::Branch(BranchNode {
			split: BranchSplit::Continuous(BranchSplitContinuous {
				feature: feature.to_owned(),
				split_value: 0.5,
			}),
			children,
			children_weights: vec![0.0; n_children],
			depth,
		})
	}

	/// The nodes are deliberately not in preorder.
	fn tree() -> Tree {
		Tree::from_nodes(
			TreeOptions::default(),
			vec![
				continuous("a", vec![3, 1], 0),
				leaf(&[("1", 7.0)], 1),
				leaf(&[("0", 10.0)], 2),
				continuous("b", vec![2, 4], 1),
				leaf(&[("0", 1.0), ("1", 2.5)], 2),
			],
		)
		.unwrap()
	}

	#[test]
	fn test_subtree_class_counts() {
		let tree = tree();
		let class_counts = tree.subtree_class_counts(3);
		assert_eq!(class_counts["0"], 11.0);
		assert_eq!(class_counts["1"], 2.5);
		let class_counts = tree.subtree_class_counts(0);
		assert_eq!(class_counts["1"], 9.5);
	}

	#[test]
	fn test_collapse_inner_branch() {
		let mut tree = tree();
		assert_eq!(tree.collapse(&[3]), 1);
		assert_eq!(tree.n_nodes(), 3);
		assert_snapshot!(tree.to_string(), @r###"
		split a <= 0.5
		  leaf 0=11 1=2.5
		  leaf 1=7
		"###);
		match tree.node(1) {
			Some(Node::Leaf(leaf)) => assert!(leaf.statistics.is_empty()),
			_ => panic!("expected a leaf"),
		}
	}

	#[test]
	fn test_collapse_root() {
		let mut tree = tree();
		assert_eq!(tree.collapse(&[0, 3]), 1);
		assert_eq!(tree.n_nodes(), 1);
		assert_snapshot!(tree.to_string(), @"leaf 0=11 1=9.5");
	}

	#[test]
	fn test_collapse_leaf_is_a_no_op() {
		let mut tree = tree();
		assert_eq!(tree.collapse(&[1, 17]), 0);
		assert_eq!(tree.n_nodes(), 5);
	}

	#[test]
	fn test_compaction_is_preorder() {
		let mut tree = tree();
		tree.compact();
		let children: Vec<Vec<usize>> = tree
			.nodes()
			.iter()
			.filter_map(|node| node.as_branch())
			.map(|branch| branch.children.clone())
			.collect();
		assert_eq!(children, vec![vec![1, 4], vec![2, 3]]);
	}
}
