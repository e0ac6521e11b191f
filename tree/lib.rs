/*!
This crate implements an online decision tree for classification, often called a Hoeffding tree or VFDT. Unlike a tree trained in batch, it never sees the whole dataset. Each instance is routed to a leaf, the leaf updates a small set of sufficient statistics, and once a leaf has seen enough weight the [Hoeffding bound](fn.hoeffding_bound.html) decides whether the best candidate split is reliably better than the runner up.

The tree also supports collapsing branches back into leaves, which is how the pruning controller in `sapling_core` keeps it small.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod collapse;
mod criterion;
mod features;
mod gaussian;
mod leaf_statistics;
mod split;
mod tree;

pub use self::criterion::SplitCriterion;
pub use self::features::{argmax, normalize, ClassCounts, Features, Value};
pub use self::gaussian::GaussianEstimator;
pub use self::leaf_statistics::{
	EnumStatistics, FeatureStatistics, LeafStatistics, NumberStatistics,
};
pub use self::split::{evaluate_split, hoeffding_bound, SplitCandidate, SplitDecision};
pub use self::tree::InvalidTreeError;

/// These are the options that control how the tree grows.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeOptions {
	/// A leaf only attempts to split after it has seen this much weight since its last attempt.
	pub grace_period: usize,
	/// This is the `δ` in the Hoeffding bound. A split is made when the best candidate is better than the runner up with probability `1 - split_confidence`.
	pub split_confidence: f64,
	/// When the Hoeffding bound falls below this value, the top candidates are considered tied and the best one is taken.
	pub tie_threshold: f64,
	/// The heuristic used to score candidate splits.
	pub split_criterion: SplitCriterion,
	/// The number of thresholds tried for each number feature.
	pub n_split_points: usize,
	/// A candidate split is only valid if at least two of its branches receive at least this fraction of the weight.
	pub min_branch_fraction: f64,
	/// Leaves at this depth never split. The root is at depth 0.
	pub max_depth: Option<usize>,
	/// If true, enum features are split one option against the rest instead of one branch per option.
	pub binary_split: bool,
	/// Laplace smoothing added to every class count when a leaf predicts.
	pub leaf_smoothing: f64,
}

impl Default for TreeOptions {
	fn default() -> Self {
		Self {
			grace_period: 200,
			split_confidence: 1e-7,
			tie_threshold: 0.05,
			split_criterion: SplitCriterion::InfoGain,
			n_split_points: 10,
			min_branch_fraction: 0.01,
			max_depth: None,
			binary_split: false,
			leaf_smoothing: 0.0,
		}
	}
}

/// Trees are stored as a `Vec` of `Node`s. Each branch holds the indexes of its children in the `Vec`. The root is always at index 0.
#[derive(Clone, Debug)]
pub struct Tree {
	options: TreeOptions,
	nodes: Vec<Node>,
	n_splits: u64,
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

impl Node {
	pub fn depth(&self) -> usize {
		match self {
			Node::Branch(branch) => branch.depth,
			Node::Leaf(leaf) => leaf.depth,
		}
	}

	pub fn as_branch(&self) -> Option<&BranchNode> {
		match self {
			Node::Branch(branch) => Some(branch),
			Node::Leaf(_) => None,
		}
	}

	pub fn as_leaf(&self) -> Option<&LeafNode> {
		match self {
			Node::Branch(_) => None,
			Node::Leaf(leaf) => Some(leaf),
		}
	}
}

/// A `BranchNode` is a branch in a tree.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchNode {
	/// The `split` determines which child an instance is sent to.
	pub split: BranchSplit,
	/// These are the indexes in the tree's node vector of this node's children.
	pub children: Vec<usize>,
	/// The weight of the instances that have been sent to each child. When an instance cannot be routed by the split, it goes to the heaviest child.
	pub children_weights: Vec<f64>,
	pub depth: usize,
}

impl BranchNode {
	/// Return the position in `children` that an instance with these features should be sent to.
	pub fn child_for(&self, features: &Features) -> usize {
		self.split
			.branch(features)
			.filter(|branch| *branch < self.children.len())
			.unwrap_or_else(|| self.heaviest_branch())
	}

	fn heaviest_branch(&self) -> usize {
		let mut heaviest = 0;
		for (branch, weight) in self.children_weights.iter().enumerate() {
			if *weight > self.children_weights[heaviest] {
				heaviest = branch;
			}
		}
		heaviest
	}
}

/// A `BranchSplit` describes which child an instance goes to given its feature values. A `Continuous` split is used for number features. `Discrete` and `DiscreteBinary` are used for enum features.
#[derive(Clone, Debug, PartialEq)]
pub enum BranchSplit {
	Continuous(BranchSplitContinuous),
	Discrete(BranchSplitDiscrete),
	DiscreteBinary(BranchSplitDiscreteBinary),
}

/// A continuous branch split takes the value of a single number feature, compares it with a `split_value`, and if the value is <= `split_value`, the instance is sent to the first child, and if it is > `split_value`, it is sent to the second.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchSplitContinuous {
	pub feature: String,
	pub split_value: f32,
}

/// A discrete branch split has one child per enum option seen when the split was made, in the same order as `options`.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchSplitDiscrete {
	pub feature: String,
	pub options: Vec<String>,
}

/// A binary discrete split sends instances whose value equals `option` to the first child and all other options to the second.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchSplitDiscreteBinary {
	pub feature: String,
	pub option: String,
}

impl BranchSplit {
	pub fn feature(&self) -> &str {
		match self {
			BranchSplit::Continuous(split) => &split.feature,
			BranchSplit::Discrete(split) => &split.feature,
			BranchSplit::DiscreteBinary(split) => &split.feature,
		}
	}

	pub fn n_branches(&self) -> usize {
		match self {
			BranchSplit::Continuous(_) => 2,
			BranchSplit::Discrete(split) => split.options.len(),
			BranchSplit::DiscreteBinary(_) => 2,
		}
	}

	/// Return the branch for these features, or `None` if the value is missing, has the wrong kind, or is an option the split has not seen.
	pub fn branch(&self, features: &Features) -> Option<usize> {
		let value = features.get(self.feature())?;
		match self {
			BranchSplit::Continuous(split) => {
				let value = value.as_number()?;
				Some(if value <= split.split_value { 0 } else { 1 })
			}
			BranchSplit::Discrete(split) => {
				let value = value.as_enum()?;
				split.options.iter().position(|option| option == value)
			}
			BranchSplit::DiscreteBinary(split) => {
				let value = value.as_enum()?;
				Some(if value == split.option { 0 } else { 1 })
			}
		}
	}
}

/// The leaves in a tree hold the class counts they predict from, and the statistics used to decide whether to split.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafNode {
	/// The class counts used for prediction. A leaf created by a split starts with the counts estimated for its branch, and a leaf created by collapsing a branch starts with the sum of the counts of the leaves it replaced.
	pub class_counts: ClassCounts,
	/// The statistics observed since this leaf was created.
	pub statistics: LeafStatistics,
	pub depth: usize,
	pub weight_at_last_split_attempt: f64,
}

impl LeafNode {
	pub fn new(class_counts: ClassCounts, depth: usize) -> Self {
		Self {
			class_counts,
			statistics: LeafStatistics::new(),
			depth,
			weight_at_last_split_attempt: 0.0,
		}
	}

	/// Return the class probabilities for this leaf.
	pub fn predict(&self, smoothing: f64) -> std::collections::BTreeMap<String, f32> {
		normalize(&self.class_counts, smoothing)
	}
}
