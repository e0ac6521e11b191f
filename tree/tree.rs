use crate::{
	features::{argmax, ClassCounts, Features},
	split::{evaluate_split, SplitCandidate, SplitDecision},
	BranchNode, BranchSplit, LeafNode, Node, Tree, TreeOptions,
};
use num_traits::ToPrimitive;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// The reason an arena passed to [`Tree::from_nodes`](struct.Tree.html#method.from_nodes) does not form a tree.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvalidTreeError {
	#[error("the tree has no nodes")]
	Empty,
	#[error("branch {0} does not have one child and one weight per branch of its split")]
	BranchShape(usize),
	#[error("branch {branch} has child {child}, which is not a node")]
	ChildOutOfRange { branch: usize, child: usize },
	#[error("node {0} is not the child of exactly one branch")]
	Parent(usize),
	#[error("node {0} is not reachable from the root")]
	Unreachable(usize),
}

fn validate_nodes(nodes: &[Node]) -> Result<(), InvalidTreeError> {
	if nodes.is_empty() {
		return Err(InvalidTreeError::Empty);
	}
	let mut n_parents = vec![0usize; nodes.len()];
	for (index, node) in nodes.iter().enumerate() {
		if let Node::Branch(branch) = node {
			let n_branches = branch.split.n_branches();
			if n_branches < 2
				|| branch.children.len() != n_branches
				|| branch.children_weights.len() != n_branches
			{
				return Err(InvalidTreeError::BranchShape(index));
			}
			for child in branch.children.iter() {
				match n_parents.get_mut(*child) {
					Some(n) => *n += 1,
					None => {
						return Err(InvalidTreeError::ChildOutOfRange {
							branch: index,
							child: *child,
						})
					}
				}
			}
		}
	}
	for (index, n) in n_parents.iter().enumerate() {
		let expected = if index == 0 { 0 } else { 1 };
		if *n != expected {
			return Err(InvalidTreeError::Parent(index));
		}
	}
	// Every node has at most one parent, so a walk from the root visits each reachable node once.
	let mut reached = vec![false; nodes.len()];
	let mut stack = vec![0];
	while let Some(index) = stack.pop() {
		reached[index] = true;
		if let Node::Branch(branch) = &nodes[index] {
			stack.extend(branch.children.iter());
		}
	}
	match reached.iter().position(|reached| !reached) {
		Some(index) => Err(InvalidTreeError::Unreachable(index)),
		None => Ok(()),
	}
}

impl Tree {
	/// Create a tree that is a single empty leaf.
	pub fn new(options: TreeOptions) -> Self {
		Self {
			options,
			nodes: vec![Node::Leaf(LeafNode::new(ClassCounts::new(), 0))],
			n_splits: 0,
		}
	}

	/// Create a tree from an existing arena. The root must be at index 0, every other node must be the child of exactly one branch and reachable from the root, and each branch must have one child and one weight per branch of its split.
	pub fn from_nodes(options: TreeOptions, nodes: Vec<Node>) -> Result<Self, InvalidTreeError> {
		validate_nodes(&nodes)?;
		Ok(Self {
			options,
			nodes,
			n_splits: 0,
		})
	}

	pub fn options(&self) -> &TreeOptions {
		&self.options
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn node(&self, index: usize) -> Option<&Node> {
		self.nodes.get(index)
	}

	pub(crate) fn nodes_mut(&mut self) -> &mut Vec<Node> {
		&mut self.nodes
	}

	/// Return the index of the leaf these features are routed to.
	pub fn route(&self, features: &Features) -> usize {
		let mut node_index = 0;
		while let Node::Branch(branch) = &self.nodes[node_index] {
			node_index = branch.children[branch.child_for(features)];
		}
		node_index
	}

	/// Learn from a single instance with weight 1. Return true if the leaf the instance reached was split.
	pub fn learn_one(&mut self, features: &Features, label: &str) -> bool {
		let weight = 1.0;
		let mut node_index = 0;
		while let Node::Branch(branch) = &mut self.nodes[node_index] {
			let branch_index = branch.child_for(features);
			branch.children_weights[branch_index] += weight;
			node_index = branch.children[branch_index];
		}
		if let Node::Leaf(leaf) = &mut self.nodes[node_index] {
			*leaf.class_counts.entry(label.to_owned()).or_insert(0.0) += weight;
			leaf.statistics.update(features, label, weight);
		}
		self.attempt_to_split(node_index)
	}

	/// Return the class probabilities of the leaf these features are routed to. Before any instance has been seen this is empty.
	pub fn predict_proba_one(&self, features: &Features) -> BTreeMap<String, f32> {
		match &self.nodes[self.route(features)] {
			Node::Leaf(leaf) => leaf.predict(self.options.leaf_smoothing),
			Node::Branch(_) => BTreeMap::new(),
		}
	}

	/// Return the most probable class, with ties going to the lowest label.
	pub fn predict_one(&self, features: &Features) -> Option<String> {
		argmax(&self.predict_proba_one(features)).map(|class| class.to_owned())
	}

	pub fn n_nodes(&self) -> usize {
		self.nodes.len()
	}

	pub fn n_leaves(&self) -> usize {
		self.nodes
			.iter()
			.filter(|node| matches!(node, Node::Leaf(_)))
			.count()
	}

	pub fn n_branches(&self) -> usize {
		self.n_nodes() - self.n_leaves()
	}

	/// The number of edges on the longest path from the root to a leaf.
	pub fn height(&self) -> usize {
		self.nodes.iter().map(|node| node.depth()).max().unwrap_or(0)
	}

	/// The features tested by at least one branch.
	pub fn split_features(&self) -> BTreeSet<String> {
		self.nodes
			.iter()
			.filter_map(|node| node.as_branch())
			.map(|branch| branch.split.feature().to_owned())
			.collect()
	}

	/// The number of splits made since the tree was created.
	pub fn n_splits(&self) -> u64 {
		self.n_splits
	}

	fn attempt_to_split(&mut self, leaf_index: usize) -> bool {
		let decision = match &mut self.nodes[leaf_index] {
			Node::Leaf(leaf) => {
				let weight_seen = leaf.statistics.total_weight();
				let grace_period = self.options.grace_period.to_f64().unwrap_or(0.0);
				if weight_seen - leaf.weight_at_last_split_attempt < grace_period {
					return false;
				}
				leaf.weight_at_last_split_attempt = weight_seen;
				if self
					.options
					.max_depth
					.map(|max_depth| leaf.depth >= max_depth)
					.unwrap_or(false)
				{
					return false;
				}
				if leaf.statistics.is_pure() {
					return false;
				}
				evaluate_split(&leaf.statistics, &self.options)
			}
			Node::Branch(_) => return false,
		};
		match decision {
			SplitDecision::Split(candidate) => {
				self.split_leaf(leaf_index, candidate);
				true
			}
			SplitDecision::Wait {
				best_merit,
				second_best_merit,
				hoeffding_bound,
			} => {
				log::trace!(
					"leaf {} waits: best merit {} second best merit {} bound {}",
					leaf_index,
					best_merit,
					second_best_merit,
					hoeffding_bound
				);
				false
			}
			SplitDecision::Degenerate => {
				log::trace!("leaf {} has no valid split", leaf_index);
				false
			}
		}
	}

	/// Replace the leaf with a branch whose children are new leaves appended to the arena. Each child starts with the class counts estimated for its branch and empty statistics, and the branch starts with those estimated totals as its children's weights.
	fn split_leaf(&mut self, leaf_index: usize, candidate: SplitCandidate) {
		let SplitCandidate {
			split,
			merit,
			children_class_counts,
		} = candidate;
		let depth = self.nodes[leaf_index].depth();
		let first_child_index = self.nodes.len();
		let n_children = children_class_counts.len();
		let children_weights: Vec<f64> = children_class_counts
			.iter()
			.map(|class_counts| class_counts.values().sum())
			.collect();
		log::debug!(
			"splitting leaf {} at depth {} on {} with merit {}",
			leaf_index,
			depth,
			split.feature(),
			merit
		);
		self.nodes.extend(
			children_class_counts
				.into_iter()
				.map(|class_counts| Node::Leaf(LeafNode::new(class_counts, depth + 1))),
		);
		self.nodes[leaf_index] = Node::Branch(BranchNode {
			split,
			children: (first_child_index..first_child_index + n_children).collect(),
			children_weights,
			depth,
		});
		self.n_splits += 1;
	}
}

impl std::fmt::Display for Tree {
	/// Write the tree with one node per line, children indented two spaces below their parent.
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut stack = vec![0];
		let mut first = true;
		while let Some(node_index) = stack.pop() {
			let node = &self.nodes[node_index];
			if !first {
				writeln!(f)?;
			}
			first = false;
			write!(f, "{:indent$}", "", indent = 2 * node.depth())?;
			match node {
				Node::Branch(branch) => {
					match &branch.split {
						BranchSplit::Continuous(split) => {
							write!(f, "split {} <= {}", split.feature, split.split_value)?
						}
						BranchSplit::Discrete(split) => write!(
							f,
							"split {} in [{}]",
							split.feature,
							split.options.join(", ")
						)?,
						BranchSplit::DiscreteBinary(split) => {
							write!(f, "split {} == {}", split.feature, split.option)?
						}
					}
					stack.extend(branch.children.iter().rev());
				}
				Node::Leaf(leaf) => {
					write!(f, "leaf")?;
					for (class, count) in leaf.class_counts.iter() {
						write!(f, " {}={}", class, count)?;
					}
				}
			}
		}
		Ok(())
	}
}
