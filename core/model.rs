use crate::{
	config::Config,
	importance::{IncrementalPfi, ScoringModel},
	pruner::is_prunable,
	Error, Options, PruneSchedule,
};
use itertools::Itertools;
use sapling_metrics::{Accuracy, AccuracyInput, CrossEntropy, CrossEntropyInput, StreamingMetric};
use sapling_tree::{argmax, Features, Tree};
use std::collections::{BTreeMap, BTreeSet};

/// An online decision tree that prunes branches on features whose importance has fallen below a threshold.
///
/// For each instance, `learn_one` grows the tree, updates the importance of every feature against the grown tree, and then runs a pruning pass if one is due. Because it takes `&mut self`, the importance estimator never scores a tree that is partway through a split or a pruning pass.
#[derive(Debug)]
pub struct HoeffdingPruningTree {
	options: Options,
	tree: Tree,
	importance: IncrementalPfi,
	important_features: BTreeSet<String>,
	n_instances_seen: u64,
	n_prune_passes: u64,
	n_branches_pruned: u64,
	prequential_accuracy: Accuracy,
	prequential_cross_entropy: CrossEntropy,
}

impl HoeffdingPruningTree {
	pub fn new(options: Options) -> Result<Self, Error> {
		options.validate()?;
		Ok(Self {
			tree: Tree::new(options.tree.clone()),
			importance: IncrementalPfi::new(options.importance.clone()),
			options,
			important_features: BTreeSet::new(),
			n_instances_seen: 0,
			n_prune_passes: 0,
			n_branches_pruned: 0,
			prequential_accuracy: Accuracy::new(),
			prequential_cross_entropy: CrossEntropy::default(),
		})
	}

	pub fn from_config(config: Config) -> Result<Self, Error> {
		Self::new(Options::from(config))
	}

	/// Learn from a single labeled instance. An instance with no features or an empty label is rejected and the model is left unchanged.
	pub fn learn_one(&mut self, features: &Features, label: &str) -> Result<(), Error> {
		if features.is_empty() {
			return Err(Error::InvalidInstance("the instance has no features".to_owned()));
		}
		if label.is_empty() {
			return Err(Error::InvalidInstance("the label is empty".to_owned()));
		}
		self.n_instances_seen += 1;
		let probabilities = self.predict_proba_one(features);
		self.prequential_accuracy.update(AccuracyInput {
			prediction: argmax(&probabilities),
			label,
		});
		self.prequential_cross_entropy.update(CrossEntropyInput {
			probabilities: &probabilities,
			label,
		});
		self.tree.learn_one(features, label);
		self.importance.update(features, label, &self.tree);
		let important_features = self.compute_important_features();
		let changed = important_features != self.important_features;
		if changed {
			log::info!(
				"important features changed from [{}] to [{}] after {} instances",
				self.important_features.iter().join(", "),
				important_features.iter().join(", "),
				self.n_instances_seen
			);
			self.important_features = important_features;
		}
		let prune_is_due = match self.options.prune_schedule {
			PruneSchedule::Every { n_instances } => self.n_instances_seen % n_instances == 0,
			PruneSchedule::OnImportantFeaturesChange => changed,
		};
		if prune_is_due {
			self.n_prune_passes += 1;
			self.prune();
		}
		Ok(())
	}

	fn compute_important_features(&self) -> BTreeSet<String> {
		let threshold = self.options.importance_threshold;
		self.importance
			.importance_values()
			.into_iter()
			.filter(|(_, importance)| !is_prunable(*importance, threshold))
			.map(|(feature, _)| feature)
			.collect()
	}

	fn prune(&mut self) {
		if self.tree.n_branches() == 0 {
			return;
		}
		if self.options.retain_all_when_none_important && self.important_features.is_empty() {
			return;
		}
		let threshold = self.options.importance_threshold;
		let importance = &self.importance;
		// A feature that has never been scored has importance zero.
		let is_feature_prunable = |feature: &str| {
			is_prunable(importance.importance(feature).unwrap_or(0.0), threshold)
		};
		let n_collapsed = self.options.pruner.prune(&mut self.tree, &is_feature_prunable);
		self.n_branches_pruned += n_collapsed as u64;
	}

	pub fn predict_proba_one(&self, features: &Features) -> BTreeMap<String, f32> {
		self.tree.predict_proba_one(features)
	}

	/// Return the most probable class, with ties going to the lowest label, or `None` before any instance has been learned.
	pub fn predict_one(&self, features: &Features) -> Option<String> {
		argmax(&self.predict_proba_one(features)).map(|class| class.to_owned())
	}

	pub fn importance_values(&self) -> BTreeMap<String, f64> {
		self.importance.importance_values()
	}

	/// The features whose importance is at least the threshold, as of the last instance.
	pub fn important_features(&self) -> &BTreeSet<String> {
		&self.important_features
	}

	pub fn importance(&self) -> &IncrementalPfi {
		&self.importance
	}

	pub fn tree(&self) -> &Tree {
		&self.tree
	}

	pub fn options(&self) -> &Options {
		&self.options
	}

	pub fn n_instances_seen(&self) -> u64 {
		self.n_instances_seen
	}

	/// The number of pruning passes that were due, including passes that collapsed nothing.
	pub fn n_prunes(&self) -> u64 {
		self.n_prune_passes
	}

	pub fn n_branches_pruned(&self) -> u64 {
		self.n_branches_pruned
	}

	/// The accuracy of predicting each instance before learning from it.
	pub fn prequential_accuracy(&self) -> Option<f64> {
		self.prequential_accuracy.clone().finalize()
	}

	/// The cross entropy of predicting each instance before learning from it.
	pub fn prequential_cross_entropy(&self) -> Option<f64> {
		self.prequential_cross_entropy.clone().finalize()
	}
}

impl ScoringModel for HoeffdingPruningTree {
	fn predict_proba_one(&self, features: &Features) -> BTreeMap<String, f32> {
		HoeffdingPruningTree::predict_proba_one(self, features)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use maplit::btreemap;
	use sapling_tree::Value;

	#[test]
	fn test_invalid_instances_leave_the_model_unchanged() {
		let mut model = HoeffdingPruningTree::new(Options::default()).unwrap();
		assert!(matches!(
			model.learn_one(&Features::new(), "0"),
			Err(Error::InvalidInstance(_))
		));
		let features = btreemap! { "a".to_owned() => Value::Number(0.5) };
		assert!(matches!(
			model.learn_one(&features, ""),
			Err(Error::InvalidInstance(_))
		));
		assert_eq!(model.n_instances_seen(), 0);
		assert_eq!(model.prequential_accuracy(), None);
		assert!(model.importance_values().is_empty());
		assert!(model.predict_proba_one(&features).is_empty());
	}

	#[test]
	fn test_invalid_options_are_rejected() {
		let mut options = Options::default();
		options.tree.split_confidence = 0.0;
		assert!(matches!(
			HoeffdingPruningTree::new(options),
			Err(Error::Configuration(_))
		));
	}

	#[test]
	fn test_nothing_is_pruned_while_no_feature_is_important() {
		let mut model = HoeffdingPruningTree::new(Options {
			importance_threshold: 10.0,
			..Options::default()
		})
		.unwrap();
		for index in 0..1000 {
			let a = (index % 100) as f32 / 100.0;
			let label = if a > 0.5 { "1" } else { "0" };
			model
				.learn_one(&btreemap! { "a".to_owned() => Value::Number(a) }, label)
				.unwrap();
		}
		assert!(model.important_features().is_empty());
		assert!(model.tree().n_branches() > 0);
		assert!(model.prequential_accuracy().unwrap() > 0.5);
		assert!(model.prequential_cross_entropy().unwrap() > 0.0);
		assert_eq!(model.n_branches_pruned(), 0);
	}

	#[test]
	fn test_everything_is_pruned_without_the_fallback() {
		let mut model = HoeffdingPruningTree::new(Options {
			importance_threshold: 10.0,
			retain_all_when_none_important: false,
			..Options::default()
		})
		.unwrap();
		for index in 0..1000 {
			let a = (index % 100) as f32 / 100.0;
			let label = if a > 0.5 { "1" } else { "0" };
			model
				.learn_one(&btreemap! { "a".to_owned() => Value::Number(a) }, label)
				.unwrap();
			assert_eq!(model.tree().n_nodes(), 1);
		}
		assert!(model.n_branches_pruned() > 0);
		assert_eq!(model.n_prunes(), 1000);
	}

	#[test]
	fn test_passes_run_only_when_the_important_features_change() {
		let mut model = HoeffdingPruningTree::new(Options {
			prune_schedule: PruneSchedule::OnImportantFeaturesChange,
			..Options::default()
		})
		.unwrap();
		let mut n_changes = 0;
		let mut last_change = None;
		for index in 0..3000 {
			let a = (index % 100) as f32 / 100.0;
			let b = ((index * 37) % 100) as f32 / 100.0;
			let label = if a > 0.5 { "1" } else { "0" };
			let important_features = model.important_features().clone();
			let n_prunes = model.n_prunes();
			model
				.learn_one(
					&btreemap! {
						"a".to_owned() => Value::Number(a),
						"b".to_owned() => Value::Number(b),
					},
					label,
				)
				.unwrap();
			if model.important_features() != &important_features {
				n_changes += 1;
				last_change = Some(index);
				assert_eq!(model.n_prunes(), n_prunes + 1);
			} else {
				assert_eq!(model.n_prunes(), n_prunes);
			}
		}
		assert!(n_changes >= 1);
		assert_eq!(model.n_prunes(), n_changes);
		assert!(model.important_features().contains("a"));
		// Once a is important the set settles, so the second half of the stream runs no passes.
		assert!(last_change.unwrap() < 1500, "last change at {:?}", last_change);
	}
}
