/*!
This crate combines the online tree from `sapling_tree` with an incremental estimate of how much the tree relies on each feature, and prunes branches that test features the tree has stopped relying on. The entry point is [`HoeffdingPruningTree`](struct.HoeffdingPruningTree.html).

```
use sapling_core::{HoeffdingPruningTree, Options};
use sapling_tree::Value;
use std::collections::BTreeMap;

let mut model = HoeffdingPruningTree::new(Options::default()).unwrap();
let mut features = BTreeMap::new();
features.insert("a".to_owned(), Value::Number(0.3));
model.learn_one(&features, "0").unwrap();
assert_eq!(model.predict_one(&features), Some("0".to_owned()));
```
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod config;
mod error;
pub mod importance;
mod model;
mod pruner;

pub use self::error::Error;
pub use self::model::HoeffdingPruningTree;
pub use self::pruner::{is_prunable, PrunerKind};

use self::importance::{ImportanceOptions, SamplingStrategy};
use sapling_tree::TreeOptions;

/// These are the options passed to [`HoeffdingPruningTree::new`](struct.HoeffdingPruningTree.html#method.new).
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
	/// Features whose importance is at least this value are important. Branches on all other features may be pruned.
	pub importance_threshold: f64,
	pub pruner: PrunerKind,
	pub prune_schedule: PruneSchedule,
	/// If true, when no feature is important every feature is treated as important, so nothing is pruned.
	pub retain_all_when_none_important: bool,
	pub tree: TreeOptions,
	pub importance: ImportanceOptions,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			importance_threshold: 0.05,
			pruner: PrunerKind::Complete,
			prune_schedule: PruneSchedule::Every { n_instances: 1 },
			retain_all_when_none_important: true,
			tree: TreeOptions::default(),
			importance: ImportanceOptions::default(),
		}
	}
}

/// When pruning passes run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PruneSchedule {
	/// After every `n_instances` instances.
	Every { n_instances: u64 },
	/// After any instance that changes the set of important features.
	OnImportantFeaturesChange,
}

impl Options {
	pub fn validate(&self) -> Result<(), Error> {
		let invalid = |message: &str| Err(Error::Configuration(message.to_owned()));
		if !self.importance_threshold.is_finite() || self.importance_threshold < 0.0 {
			return invalid("importance_threshold must be a finite number >= 0");
		}
		if let PruneSchedule::Every { n_instances: 0 } = self.prune_schedule {
			return invalid("prune_schedule n_instances must be > 0");
		}
		let tree = &self.tree;
		if tree.grace_period == 0 {
			return invalid("grace_period must be > 0");
		}
		if !(tree.split_confidence > 0.0 && tree.split_confidence < 1.0) {
			return invalid("split_confidence must be in (0, 1)");
		}
		if !(tree.tie_threshold >= 0.0) {
			return invalid("tie_threshold must be >= 0");
		}
		if tree.n_split_points == 0 {
			return invalid("n_split_points must be > 0");
		}
		if !(tree.min_branch_fraction >= 0.0 && tree.min_branch_fraction <= 0.5) {
			return invalid("min_branch_fraction must be in [0, 0.5]");
		}
		if !(tree.leaf_smoothing >= 0.0) {
			return invalid("leaf_smoothing must be >= 0");
		}
		let importance = &self.importance;
		if !(importance.smoothing_rate > 0.0 && importance.smoothing_rate <= 1.0) {
			return invalid("smoothing_rate must be in (0, 1]");
		}
		if importance.n_inner_samples == 0 {
			return invalid("n_inner_samples must be > 0");
		}
		if importance.features_per_update == Some(0) {
			return invalid("features_per_update must be > 0");
		}
		if importance.storage_size == 0 {
			return invalid("storage_size must be > 0");
		}
		if let SamplingStrategy::GeometricReservoir {
			replacement_probability: Some(replacement_probability),
		} = importance.sampling_strategy
		{
			if !(replacement_probability >= 0.0 && replacement_probability <= 1.0) {
				return invalid("replacement_probability must be in [0, 1]");
			}
		}
		Ok(())
	}
}

#[test]
fn test_default_options_are_valid() {
	assert_eq!(Options::default().validate(), Ok(()));
}

#[test]
fn test_invalid_options() {
	let mut options = Options::default();
	options.importance_threshold = -0.1;
	assert!(matches!(options.validate(), Err(Error::Configuration(_))));

	let mut options = Options::default();
	options.tree.split_confidence = 1.0;
	assert!(matches!(options.validate(), Err(Error::Configuration(_))));

	let mut options = Options::default();
	options.importance.smoothing_rate = 0.0;
	assert!(matches!(options.validate(), Err(Error::Configuration(_))));

	let mut options = Options::default();
	options.importance.smoothing_rate = 1.0;
	assert_eq!(options.validate(), Ok(()));

	let mut options = Options::default();
	options.tree.grace_period = 0;
	assert!(matches!(options.validate(), Err(Error::Configuration(_))));

	let mut options = Options::default();
	options.importance.storage_size = 0;
	assert!(matches!(options.validate(), Err(Error::Configuration(_))));

	let mut options = Options::default();
	options.prune_schedule = PruneSchedule::Every { n_instances: 0 };
	assert!(matches!(options.validate(), Err(Error::Configuration(_))));
}
