/*!
This module defines the `Config` struct, which is the file representation of [`Options`](../struct.Options.html). Every field is optional, and fields that are not set take their default values.

```yaml
importance_threshold: 0.05
pruner: selective
prune_schedule:
  type: every
  n_instances: 10
tree:
  grace_period: 100
  split_criterion: gini
importance:
  smoothing_rate: 0.01
  sampling_strategy:
    type: geometric_reservoir
    replacement_probability: 0.02
```
*/

use crate::{
	importance::{self, ImportanceOptions},
	Options, PrunerKind,
};
use anyhow::{Context, Result};
use sapling_tree::{SplitCriterion, TreeOptions};
use std::path::Path;

#[derive(Debug, Default, serde::Deserialize)]
pub struct Config {
	pub importance_threshold: Option<f64>,
	pub pruner: Option<Pruner>,
	pub prune_schedule: Option<PruneSchedule>,
	pub retain_all_when_none_important: Option<bool>,
	pub tree: Option<TreeConfig>,
	pub importance: Option<ImportanceConfig>,
}

#[derive(Debug, serde::Deserialize)]
pub enum Pruner {
	#[serde(rename = "complete")]
	Complete,
	#[serde(rename = "selective")]
	Selective,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type")]
pub enum PruneSchedule {
	#[serde(rename = "every")]
	Every { n_instances: u64 },
	#[serde(rename = "on_important_features_change")]
	OnImportantFeaturesChange,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct TreeConfig {
	pub grace_period: Option<usize>,
	pub split_confidence: Option<f64>,
	pub tie_threshold: Option<f64>,
	pub split_criterion: Option<Criterion>,
	pub n_split_points: Option<usize>,
	pub min_branch_fraction: Option<f64>,
	pub max_depth: Option<usize>,
	pub binary_split: Option<bool>,
	pub leaf_smoothing: Option<f64>,
}

#[derive(Debug, serde::Deserialize)]
pub enum Criterion {
	#[serde(rename = "info_gain")]
	InfoGain,
	#[serde(rename = "gini")]
	Gini,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ImportanceConfig {
	pub smoothing_rate: Option<f64>,
	pub tracker: Option<Tracker>,
	pub n_inner_samples: Option<usize>,
	pub features_per_update: Option<usize>,
	pub loss: Option<Loss>,
	pub sampling_strategy: Option<SamplingStrategy>,
	pub storage_size: Option<usize>,
	pub imputer: Option<Imputer>,
	pub seed: Option<u64>,
}

#[derive(Debug, serde::Deserialize)]
pub enum Tracker {
	#[serde(rename = "exponential_smoothing")]
	ExponentialSmoothing,
	#[serde(rename = "welford")]
	Welford,
}

#[derive(Debug, serde::Deserialize)]
pub enum Loss {
	#[serde(rename = "zero_one")]
	ZeroOne,
	#[serde(rename = "cross_entropy")]
	CrossEntropy,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type")]
pub enum SamplingStrategy {
	#[serde(rename = "uniform_reservoir")]
	UniformReservoir,
	#[serde(rename = "geometric_reservoir")]
	GeometricReservoir {
		replacement_probability: Option<f64>,
	},
	#[serde(rename = "sliding_window")]
	SlidingWindow,
}

#[derive(Debug, serde::Deserialize)]
pub enum Imputer {
	#[serde(rename = "marginal")]
	Marginal,
}

impl From<Config> for Options {
	fn from(config: Config) -> Self {
		let defaults = Options::default();
		Options {
			importance_threshold: config
				.importance_threshold
				.unwrap_or(defaults.importance_threshold),
			pruner: match config.pruner {
				Some(Pruner::Complete) => PrunerKind::Complete,
				Some(Pruner::Selective) => PrunerKind::Selective,
				None => defaults.pruner,
			},
			prune_schedule: match config.prune_schedule {
				Some(PruneSchedule::Every { n_instances }) => {
					crate::PruneSchedule::Every { n_instances }
				}
				Some(PruneSchedule::OnImportantFeaturesChange) => {
					crate::PruneSchedule::OnImportantFeaturesChange
				}
				None => defaults.prune_schedule,
			},
			retain_all_when_none_important: config
				.retain_all_when_none_important
				.unwrap_or(defaults.retain_all_when_none_important),
			tree: config.tree.unwrap_or_default().into(),
			importance: config.importance.unwrap_or_default().into(),
		}
	}
}

impl From<TreeConfig> for TreeOptions {
	fn from(config: TreeConfig) -> Self {
		let defaults = TreeOptions::default();
		TreeOptions {
			grace_period: config.grace_period.unwrap_or(defaults.grace_period),
			split_confidence: config.split_confidence.unwrap_or(defaults.split_confidence),
			tie_threshold: config.tie_threshold.unwrap_or(defaults.tie_threshold),
			split_criterion: match config.split_criterion {
				Some(Criterion::InfoGain) => SplitCriterion::InfoGain,
				Some(Criterion::Gini) => SplitCriterion::Gini,
				None => defaults.split_criterion,
			},
			n_split_points: config.n_split_points.unwrap_or(defaults.n_split_points),
			min_branch_fraction: config
				.min_branch_fraction
				.unwrap_or(defaults.min_branch_fraction),
			max_depth: config.max_depth.or(defaults.max_depth),
			binary_split: config.binary_split.unwrap_or(defaults.binary_split),
			leaf_smoothing: config.leaf_smoothing.unwrap_or(defaults.leaf_smoothing),
		}
	}
}

impl From<ImportanceConfig> for ImportanceOptions {
	fn from(config: ImportanceConfig) -> Self {
		let defaults = ImportanceOptions::default();
		ImportanceOptions {
			smoothing_rate: config.smoothing_rate.unwrap_or(defaults.smoothing_rate),
			tracker: match config.tracker {
				Some(Tracker::ExponentialSmoothing) => importance::TrackerKind::ExponentialSmoothing,
				Some(Tracker::Welford) => importance::TrackerKind::Welford,
				None => defaults.tracker,
			},
			n_inner_samples: config.n_inner_samples.unwrap_or(defaults.n_inner_samples),
			features_per_update: config.features_per_update.or(defaults.features_per_update),
			loss: match config.loss {
				Some(Loss::ZeroOne) => importance::Loss::ZeroOne,
				Some(Loss::CrossEntropy) => importance::Loss::CrossEntropy,
				None => defaults.loss,
			},
			sampling_strategy: match config.sampling_strategy {
				Some(SamplingStrategy::UniformReservoir) => {
					importance::SamplingStrategy::UniformReservoir
				}
				Some(SamplingStrategy::GeometricReservoir {
					replacement_probability,
				}) => importance::SamplingStrategy::GeometricReservoir {
					replacement_probability,
				},
				Some(SamplingStrategy::SlidingWindow) => importance::SamplingStrategy::SlidingWindow,
				None => defaults.sampling_strategy,
			},
			storage_size: config.storage_size.unwrap_or(defaults.storage_size),
			imputer: match config.imputer {
				Some(Imputer::Marginal) => importance::ImputerKind::Marginal,
				None => defaults.imputer,
			},
			seed: config.seed.unwrap_or(defaults.seed),
		}
	}
}

/// Read a config file. Files with a `.json` extension are parsed as JSON and all others as YAML.
pub fn load_config(config_path: &Path) -> Result<Config> {
	let config = std::fs::read_to_string(config_path)
		.with_context(|| format!("failed to read config file {}", config_path.display()))?;
	let is_json = config_path
		.extension()
		.map(|extension| extension == "json")
		.unwrap_or(false);
	let config = if is_json {
		serde_json::from_str(&config)
			.with_context(|| format!("failed to parse config file {}", config_path.display()))?
	} else {
		serde_yaml::from_str(&config)
			.with_context(|| format!("failed to parse config file {}", config_path.display()))?
	};
	Ok(config)
}

#[test]
fn test_yaml_config() {
	let config: Config = serde_yaml::from_str(
		r#"
importance_threshold: 0.1
pruner: selective
prune_schedule:
  type: on_important_features_change
tree:
  grace_period: 100
  split_criterion: gini
  max_depth: 4
importance:
  smoothing_rate: 0.01
  tracker: welford
  loss: cross_entropy
  sampling_strategy:
    type: geometric_reservoir
    replacement_probability: 0.02
"#,
	)
	.unwrap();
	let options = Options::from(config);
	assert_eq!(options.importance_threshold, 0.1);
	assert_eq!(options.pruner, PrunerKind::Selective);
	assert_eq!(
		options.prune_schedule,
		crate::PruneSchedule::OnImportantFeaturesChange
	);
	assert!(options.retain_all_when_none_important);
	assert_eq!(options.tree.grace_period, 100);
	assert_eq!(options.tree.split_criterion, SplitCriterion::Gini);
	assert_eq!(options.tree.max_depth, Some(4));
	assert_eq!(options.tree.n_split_points, 10);
	assert_eq!(options.importance.smoothing_rate, 0.01);
	assert_eq!(options.importance.tracker, importance::TrackerKind::Welford);
	assert_eq!(options.importance.loss, importance::Loss::CrossEntropy);
	assert_eq!(
		options.importance.sampling_strategy,
		importance::SamplingStrategy::GeometricReservoir {
			replacement_probability: Some(0.02)
		}
	);
	assert_eq!(options.importance.n_inner_samples, 5);
}

#[test]
fn test_empty_config_is_the_default() {
	let config: Config = serde_json::from_str("{}").unwrap();
	assert_eq!(Options::from(config), Options::default());
}

#[test]
fn test_load_config() {
	let path = std::env::temp_dir().join(format!("sapling_config_{}.json", std::process::id()));
	std::fs::write(
		&path,
		r#"{ "prune_schedule": { "type": "every", "n_instances": 25 }, "importance": { "seed": 7 } }"#,
	)
	.unwrap();
	let options = Options::from(load_config(&path).unwrap());
	std::fs::remove_file(&path).unwrap();
	assert_eq!(
		options.prune_schedule,
		crate::PruneSchedule::Every { n_instances: 25 }
	);
	assert_eq!(options.importance.seed, 7);
	assert!(load_config(Path::new("/nonexistent/sapling.yaml")).is_err());
}
