use crate::{
	features::ClassCounts,
	leaf_statistics::{EnumStatistics, FeatureStatistics, LeafStatistics, NumberStatistics},
	BranchSplit, BranchSplitContinuous, BranchSplitDiscrete, BranchSplitDiscreteBinary,
	TreeOptions,
};
use num_traits::ToPrimitive;
use std::cmp::Ordering;

/// A way to split a leaf, along with its merit and the estimated class counts of each branch.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitCandidate {
	pub split: BranchSplit,
	pub merit: f64,
	pub children_class_counts: Vec<ClassCounts>,
}

/// The result of evaluating whether a leaf should split.
#[derive(Clone, Debug, PartialEq)]
pub enum SplitDecision {
	/// The best candidate passed the Hoeffding test, or the bound fell below the tie threshold.
	Split(SplitCandidate),
	/// There is a valid candidate but the leaf has not seen enough weight to be confident in it.
	Wait {
		best_merit: f64,
		second_best_merit: f64,
		hoeffding_bound: f64,
	},
	/// No feature has statistics that produce a valid split with positive merit.
	Degenerate,
}

/// With probability `1 - confidence`, the true mean of a variable with range `range` is within this distance of the mean of `n` observations.
pub fn hoeffding_bound(range: f64, confidence: f64, n: f64) -> f64 {
	((range * range * (1.0 / confidence).ln()) / (2.0 * n)).sqrt()
}

/// Decide whether a leaf with these statistics should split. The null split, which keeps the leaf as it is, always has merit zero, so a lone candidate is compared against it.
pub fn evaluate_split(statistics: &LeafStatistics, options: &TreeOptions) -> SplitDecision {
	let pre_split = statistics.class_counts();
	let mut candidates: Vec<SplitCandidate> = statistics
		.features()
		.iter()
		.filter_map(|(feature, feature_statistics)| {
			find_best_split_for_feature(feature, feature_statistics, pre_split, options)
		})
		.filter(|candidate| candidate.merit.is_finite() && candidate.merit > 0.0)
		.collect();
	// The sort is stable, so candidates with equal merit stay in feature name order.
	candidates.sort_by(|a, b| b.merit.partial_cmp(&a.merit).unwrap_or(Ordering::Equal));
	let mut candidates = candidates.into_iter();
	let best = match candidates.next() {
		Some(best) => best,
		None => return SplitDecision::Degenerate,
	};
	let second_best_merit = candidates
		.next()
		.map(|candidate| candidate.merit)
		.unwrap_or(0.0);
	let hoeffding_bound = hoeffding_bound(
		options.split_criterion.range(pre_split),
		options.split_confidence,
		statistics.total_weight(),
	);
	if best.merit - second_best_merit > hoeffding_bound || hoeffding_bound < options.tie_threshold
	{
		SplitDecision::Split(best)
	} else {
		SplitDecision::Wait {
			best_merit: best.merit,
			second_best_merit,
			hoeffding_bound,
		}
	}
}

/// Find the best split for a single feature, if its statistics allow one.
pub fn find_best_split_for_feature(
	feature: &str,
	statistics: &FeatureStatistics,
	pre_split: &ClassCounts,
	options: &TreeOptions,
) -> Option<SplitCandidate> {
	match statistics {
		FeatureStatistics::Number(statistics) => {
			find_best_continuous_split(feature, statistics, pre_split, options)
		}
		FeatureStatistics::Enum(statistics) if options.binary_split => {
			find_best_discrete_binary_split(feature, statistics, pre_split, options)
		}
		FeatureStatistics::Enum(statistics) => {
			find_discrete_split(feature, statistics, pre_split, options)
		}
	}
}

/// Try `n_split_points` thresholds evenly spaced strictly between the smallest and largest values seen, estimating each class's share on either side from its Gaussian.
fn find_best_continuous_split(
	feature: &str,
	statistics: &NumberStatistics,
	pre_split: &ClassCounts,
	options: &TreeOptions,
) -> Option<SplitCandidate> {
	let (min, max) = statistics.range()?;
	if !(min < max) {
		return None;
	}
	let n_intervals = (options.n_split_points + 1).to_f32()?;
	let mut best: Option<SplitCandidate> = None;
	for split_point_index in 1..=options.n_split_points {
		let split_value = min + (max - min) * split_point_index.to_f32()? / n_intervals;
		let mut left = ClassCounts::new();
		let mut right = ClassCounts::new();
		for (class, estimator) in statistics.estimators.iter() {
			let (left_weight, right_weight) = estimator.split_weights(split_value);
			left.insert(class.clone(), left_weight);
			right.insert(class.clone(), right_weight);
		}
		let children_class_counts = vec![left, right];
		let merit = options.split_criterion.merit(
			pre_split,
			&children_class_counts,
			options.min_branch_fraction,
		);
		if best.as_ref().map(|best| merit > best.merit).unwrap_or(true) {
			best = Some(SplitCandidate {
				split: BranchSplit::Continuous(BranchSplitContinuous {
					feature: feature.to_owned(),
					split_value,
				}),
				merit,
				children_class_counts,
			});
		}
	}
	best
}

/// One branch per option seen so far.
fn find_discrete_split(
	feature: &str,
	statistics: &EnumStatistics,
	pre_split: &ClassCounts,
	options: &TreeOptions,
) -> Option<SplitCandidate> {
	if statistics.class_counts.len() < 2 {
		return None;
	}
	let enum_options: Vec<String> = statistics.class_counts.keys().cloned().collect();
	let children_class_counts: Vec<ClassCounts> =
		statistics.class_counts.values().cloned().collect();
	let merit = options.split_criterion.merit(
		pre_split,
		&children_class_counts,
		options.min_branch_fraction,
	);
	Some(SplitCandidate {
		split: BranchSplit::Discrete(BranchSplitDiscrete {
			feature: feature.to_owned(),
			options: enum_options,
		}),
		merit,
		children_class_counts,
	})
}

/// Each option against all of the others.
fn find_best_discrete_binary_split(
	feature: &str,
	statistics: &EnumStatistics,
	pre_split: &ClassCounts,
	options: &TreeOptions,
) -> Option<SplitCandidate> {
	if statistics.class_counts.len() < 2 {
		return None;
	}
	let mut best: Option<SplitCandidate> = None;
	for option in statistics.class_counts.keys() {
		let mut equal = ClassCounts::new();
		let mut not_equal = ClassCounts::new();
		for (other_option, class_counts) in statistics.class_counts.iter() {
			let side = if other_option == option {
				&mut equal
			} else {
				&mut not_equal
			};
			crate::features::add_class_counts(side, class_counts);
		}
		let children_class_counts = vec![equal, not_equal];
		let merit = options.split_criterion.merit(
			pre_split,
			&children_class_counts,
			options.min_branch_fraction,
		);
		if best.as_ref().map(|best| merit > best.merit).unwrap_or(true) {
			best = Some(SplitCandidate {
				split: BranchSplit::DiscreteBinary(BranchSplitDiscreteBinary {
					feature: feature.to_owned(),
					option: option.clone(),
				}),
				merit,
				children_class_counts,
			});
		}
	}
	best
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::features::Value;
	use maplit::btreemap;

	#[test]
	fn test_hoeffding_bound() {
		let bound = hoeffding_bound(1.0, 1e-7, 200.0);
		assert!((bound - 0.200_74).abs() < 1e-4);
		assert!(hoeffding_bound(1.0, 1e-7, 4000.0) < bound);
	}

	#[test]
	fn test_degenerate_when_every_value_is_the_same() {
		let mut statistics = LeafStatistics::new();
		for index in 0..100 {
			let label = if index % 2 == 0 { "a" } else { "b" };
			statistics.update(&btreemap! { "x".to_owned() => Value::Number(1.0) }, label, 1.0);
		}
		let decision = evaluate_split(&statistics, &TreeOptions::default());
		assert_eq!(decision, SplitDecision::Degenerate);
	}

	#[test]
	fn test_split_on_separable_feature() {
		let mut statistics = LeafStatistics::new();
		for index in 0..200 {
			let x = index as f32 / 200.0;
			let label = if x < 0.5 { "a" } else { "b" };
			statistics.update(
				&btreemap! {
					"x".to_owned() => Value::Number(x),
					"color".to_owned() => Value::from(if index % 3 == 0 { "red" } else { "blue" }),
				},
				label,
				1.0,
			);
		}
		match evaluate_split(&statistics, &TreeOptions::default()) {
			SplitDecision::Split(candidate) => {
				assert_eq!(candidate.split.feature(), "x");
				assert_eq!(candidate.children_class_counts.len(), 2);
				assert!(candidate.merit > 0.5);
			}
			decision => panic!("expected a split, got {:?}", decision),
		}
	}

	#[test]
	fn test_wait_when_the_bound_is_not_met() {
		let mut statistics = LeafStatistics::new();
		for index in 0..20 {
			let label = if index % 2 == 0 { "a" } else { "b" };
			let color = if index % 4 < 2 { "red" } else { "blue" };
			let shade = if index % 4 == 0 { "dark" } else { "light" };
			statistics.update(
				&btreemap! {
					"color".to_owned() => Value::from(color),
					"shade".to_owned() => Value::from(shade),
				},
				label,
				1.0,
			);
		}
		match evaluate_split(&statistics, &TreeOptions::default()) {
			SplitDecision::Wait {
				best_merit,
				hoeffding_bound,
				..
			} => {
				assert!(best_merit > 0.0);
				assert!(hoeffding_bound > 0.5);
			}
			decision => panic!("expected to wait, got {:?}", decision),
		}
	}

	#[test]
	fn test_binary_discrete_split() {
		let mut statistics = LeafStatistics::new();
		for (color, label) in &[("red", "a"), ("green", "b"), ("blue", "b")] {
			for _ in 0..100 {
				statistics.update(&btreemap! { "color".to_owned() => Value::from(*color) }, label, 1.0);
			}
		}
		let options = TreeOptions {
			binary_split: true,
			..TreeOptions::default()
		};
		match evaluate_split(&statistics, &options) {
			SplitDecision::Split(SplitCandidate {
				split: BranchSplit::DiscreteBinary(split),
				..
			}) => {
				assert_eq!(split.feature, "color");
				assert_eq!(split.option, "red");
			}
			decision => panic!("expected a binary split, got {:?}", decision),
		}
	}
}
