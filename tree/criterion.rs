use crate::features::ClassCounts;
use itertools::izip;
use num_traits::ToPrimitive;

/// The heuristic used to score candidate splits. Both measure the reduction in impurity from the class distribution before the split to the weighted class distributions of the branches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SplitCriterion {
	/// Reduction in entropy, in bits.
	InfoGain,
	/// Reduction in Gini impurity.
	Gini,
}

impl Default for SplitCriterion {
	fn default() -> Self {
		SplitCriterion::InfoGain
	}
}

impl SplitCriterion {
	/// Compute the merit of splitting `pre_split` into `post_split`. A split is invalid, with merit negative infinity, unless at least two branches each receive at least `min_branch_fraction` of the weight.
	pub fn merit(
		&self,
		pre_split: &ClassCounts,
		post_split: &[ClassCounts],
		min_branch_fraction: f64,
	) -> f64 {
		let branch_weights: Vec<f64> = post_split.iter().map(total_weight).collect();
		let total = branch_weights.iter().sum::<f64>();
		if total <= 0.0 {
			return std::f64::NEG_INFINITY;
		}
		let n_large_branches = branch_weights
			.iter()
			.filter(|weight| **weight / total >= min_branch_fraction)
			.count();
		if n_large_branches < 2 {
			return std::f64::NEG_INFINITY;
		}
		let post_split_impurity = izip!(post_split, branch_weights.iter())
			.map(|(class_counts, weight)| weight / total * self.impurity(class_counts))
			.sum::<f64>();
		self.impurity(pre_split) - post_split_impurity
	}

	/// The range of possible merit values, which is the `R` in the Hoeffding bound.
	pub fn range(&self, pre_split: &ClassCounts) -> f64 {
		match self {
			SplitCriterion::InfoGain => {
				let n_classes = pre_split.len().max(2).to_f64().unwrap_or(2.0);
				n_classes.log2()
			}
			SplitCriterion::Gini => 1.0,
		}
	}

	fn impurity(&self, class_counts: &ClassCounts) -> f64 {
		match self {
			SplitCriterion::InfoGain => entropy(class_counts),
			SplitCriterion::Gini => gini(class_counts),
		}
	}
}

fn total_weight(class_counts: &ClassCounts) -> f64 {
	class_counts.values().sum()
}

fn entropy(class_counts: &ClassCounts) -> f64 {
	let total = total_weight(class_counts);
	if total <= 0.0 {
		return 0.0;
	}
	class_counts
		.values()
		.filter(|count| **count > 0.0)
		.map(|count| {
			let p = count / total;
			-p * p.log2()
		})
		.sum()
}

fn gini(class_counts: &ClassCounts) -> f64 {
	let total = total_weight(class_counts);
	if total <= 0.0 {
		return 0.0;
	}
	1.0 - class_counts
		.values()
		.map(|count| {
			let p = count / total;
			p * p
		})
		.sum::<f64>()
}
