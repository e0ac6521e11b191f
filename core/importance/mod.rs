/*!
This module implements incremental permutation feature importance. For every instance, each feature is replaced by values drawn from a memory of recent instances, and the increase in the model's loss is folded into a running estimate of that feature's importance. A feature the model does not use has an importance of exactly zero, because replacing it never changes a prediction.
*/

mod imputer;
mod loss;
mod storage;

pub use self::imputer::{Imputer, MarginalImputer, SampleError};
pub use self::loss::Loss;
pub use self::storage::{GeometricReservoir, SlidingWindow, Storage, UniformReservoir};

use rand::{seq::SliceRandom, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use sapling_metrics::{Mean, StreamingMetric};
use sapling_tree::Features;
use std::collections::BTreeMap;

/// Anything that produces class probabilities for an instance can have its features scored.
pub trait ScoringModel {
	fn predict_proba_one(&self, features: &Features) -> BTreeMap<String, f32>;
}

impl ScoringModel for sapling_tree::Tree {
	fn predict_proba_one(&self, features: &Features) -> BTreeMap<String, f32> {
		sapling_tree::Tree::predict_proba_one(self, features)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportanceOptions {
	/// The weight given to the newest marginal contribution by the exponential smoothing tracker.
	pub smoothing_rate: f64,
	pub tracker: TrackerKind,
	/// The number of replacement values drawn per feature per instance. The feature's loss is the mean over the draws.
	pub n_inner_samples: usize,
	/// If `Some`, only this many features, chosen at random, are scored per instance.
	pub features_per_update: Option<usize>,
	pub loss: Loss,
	pub sampling_strategy: SamplingStrategy,
	pub storage_size: usize,
	pub imputer: ImputerKind,
	pub seed: u64,
}

impl Default for ImportanceOptions {
	fn default() -> Self {
		Self {
			smoothing_rate: 0.001,
			tracker: TrackerKind::ExponentialSmoothing,
			n_inner_samples: 5,
			features_per_update: None,
			loss: Loss::ZeroOne,
			sampling_strategy: SamplingStrategy::GeometricReservoir {
				replacement_probability: None,
			},
			storage_size: 100,
			imputer: ImputerKind::Marginal,
			seed: 42,
		}
	}
}

/// How the marginal contributions of a feature are combined into its importance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackerKind {
	/// Recent contributions count more, so the importance follows a changing model.
	ExponentialSmoothing,
	/// Every contribution counts the same. This is the running mean.
	Welford,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SamplingStrategy {
	UniformReservoir,
	GeometricReservoir {
		replacement_probability: Option<f64>,
	},
	SlidingWindow,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImputerKind {
	Marginal,
}

/// The running importance of one feature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportanceValue {
	pub value: f64,
	pub last_marginal_contribution: f64,
	/// The number of times the value has been updated.
	pub n: u64,
}

impl ImportanceValue {
	fn update(&mut self, marginal_contribution: f64, tracker: TrackerKind, smoothing_rate: f64) {
		self.n += 1;
		self.last_marginal_contribution = marginal_contribution;
		self.value = match tracker {
			TrackerKind::ExponentialSmoothing => {
				(1.0 - smoothing_rate) * self.value + smoothing_rate * marginal_contribution
			}
			TrackerKind::Welford => {
				self.value + (marginal_contribution - self.value) / self.n as f64
			}
		};
	}
}

#[derive(Debug)]
pub struct IncrementalPfi {
	options: ImportanceOptions,
	rng: Xoshiro256Plus,
	storage: Box<dyn Storage>,
	imputer: Box<dyn Imputer>,
	values: BTreeMap<String, ImportanceValue>,
}

impl IncrementalPfi {
	pub fn new(options: ImportanceOptions) -> Self {
		let storage: Box<dyn Storage> = match options.sampling_strategy {
			SamplingStrategy::UniformReservoir => {
				Box::new(UniformReservoir::new(options.storage_size))
			}
			SamplingStrategy::GeometricReservoir {
				replacement_probability,
			} => Box::new(GeometricReservoir::new(
				options.storage_size,
				replacement_probability,
			)),
			SamplingStrategy::SlidingWindow => Box::new(SlidingWindow::new(options.storage_size)),
		};
		let imputer: Box<dyn Imputer> = match options.imputer {
			ImputerKind::Marginal => Box::new(MarginalImputer),
		};
		Self {
			rng: Xoshiro256Plus::seed_from_u64(options.seed),
			options,
			storage,
			imputer,
			values: BTreeMap::new(),
		}
	}

	/// Score the features of one labeled instance against `model`, then add the instance to the sampling memory.
	pub fn update(&mut self, features: &Features, label: &str, model: &dyn ScoringModel) {
		for feature in features.keys() {
			self.values.entry(feature.clone()).or_default();
		}
		let loss = self.options.loss;
		let base_loss = loss.compute(&model.predict_proba_one(features), label);
		let mut perturbed = features.clone();
		for feature in self.choose_features(features) {
			let observed = match features.get(&feature) {
				Some(observed) => observed.clone(),
				None => continue,
			};
			let mut perturbed_loss = Mean::new();
			for _ in 0..self.options.n_inner_samples {
				match self
					.imputer
					.draw(&feature, self.storage.as_ref(), &mut self.rng)
				{
					Ok(value) => {
						perturbed.insert(feature.clone(), value);
						perturbed_loss.update(loss.compute(&model.predict_proba_one(&perturbed), label));
					}
					Err(error) => log::trace!("skipping draw for {}: {}", feature, error),
				}
			}
			perturbed.insert(feature.clone(), observed);
			if let (Some(perturbed_loss), Some(value)) =
				(perturbed_loss.finalize(), self.values.get_mut(&feature))
			{
				value.update(
					perturbed_loss - base_loss,
					self.options.tracker,
					self.options.smoothing_rate,
				);
			}
		}
		self.storage.update(features, &mut self.rng);
	}

	fn choose_features(&mut self, features: &Features) -> Vec<String> {
		let names: Vec<&String> = features.keys().collect();
		match self.options.features_per_update {
			Some(n_features) if n_features < names.len() => {
				let mut chosen: Vec<String> = names
					.choose_multiple(&mut self.rng, n_features)
					.map(|name| (*name).clone())
					.collect();
				chosen.sort();
				chosen
			}
			_ => names.into_iter().cloned().collect(),
		}
	}

	/// The importance of `feature`, or `None` if it has never been seen.
	pub fn importance(&self, feature: &str) -> Option<f64> {
		self.values.get(feature).map(|value| value.value)
	}

	pub fn importance_values(&self) -> BTreeMap<String, f64> {
		self.values
			.iter()
			.map(|(feature, value)| (feature.clone(), value.value))
			.collect()
	}

	pub fn values(&self) -> &BTreeMap<String, ImportanceValue> {
		&self.values
	}

	pub fn options(&self) -> &ImportanceOptions {
		&self.options
	}

	pub fn storage_len(&self) -> usize {
		self.storage.len()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use maplit::btreemap;
	use rand::Rng;
	use sapling_tree::Value;

	/// Predicts "1" when `a` is above one half, ignoring every other feature.
	struct Threshold;

	impl ScoringModel for Threshold {
		fn predict_proba_one(&self, features: &Features) -> BTreeMap<String, f32> {
			let a = features
				.get("a")
				.and_then(|value| value.as_number())
				.unwrap_or(0.0);
			let label = if a > 0.5 { "1" } else { "0" };
			btreemap! { label.to_owned() => 1.0 }
		}
	}

	fn run(options: ImportanceOptions, n: usize) -> IncrementalPfi {
		let mut rng = Xoshiro256Plus::seed_from_u64(1);
		let mut pfi = IncrementalPfi::new(options);
		for _ in 0..n {
			let a: f32 = rng.gen();
			let b: f32 = rng.gen();
			let label = if a > 0.5 { "1" } else { "0" };
			let features = btreemap! {
				"a".to_owned() => Value::Number(a),
				"b".to_owned() => Value::Number(b),
			};
			pfi.update(&features, label, &Threshold);
		}
		pfi
	}

	#[test]
	fn test_unused_feature_has_zero_importance() {
		let pfi = run(
			ImportanceOptions {
				smoothing_rate: 0.05,
				..ImportanceOptions::default()
			},
			1000,
		);
		assert_eq!(pfi.importance("b"), Some(0.0));
		let a = pfi.importance("a").unwrap();
		assert!(a > 0.25 && a < 0.75, "importance of a was {}", a);
		assert_eq!(pfi.importance("c"), None);
		assert_eq!(pfi.storage_len(), 100);
	}

	#[test]
	fn test_first_instance_registers_features_at_zero() {
		let pfi = run(ImportanceOptions::default(), 1);
		assert_eq!(
			pfi.importance_values(),
			btreemap! { "a".to_owned() => 0.0, "b".to_owned() => 0.0 }
		);
		// The memory was empty, so no draw succeeded.
		assert_eq!(pfi.values()["a"].n, 0);
	}

	#[test]
	fn test_welford_tracker() {
		let pfi = run(
			ImportanceOptions {
				tracker: TrackerKind::Welford,
				sampling_strategy: SamplingStrategy::UniformReservoir,
				..ImportanceOptions::default()
			},
			1000,
		);
		let a = pfi.importance("a").unwrap();
		assert!(a > 0.35 && a < 0.65, "importance of a was {}", a);
		assert_eq!(pfi.values()["a"].n, 999);
	}

	#[test]
	fn test_features_per_update() {
		let pfi = run(
			ImportanceOptions {
				features_per_update: Some(1),
				sampling_strategy: SamplingStrategy::SlidingWindow,
				..ImportanceOptions::default()
			},
			500,
		);
		let values = pfi.values();
		assert_eq!(values["a"].n + values["b"].n, 499);
		assert!(values["a"].n > 0 && values["b"].n > 0);
	}

	#[test]
	fn test_same_seed_same_importance() {
		let options = ImportanceOptions {
			smoothing_rate: 0.1,
			n_inner_samples: 1,
			..ImportanceOptions::default()
		};
		let first = run(options.clone(), 300);
		let second = run(options, 300);
		assert_eq!(first.importance_values(), second.importance_values());
	}

	#[test]
	fn test_exponential_smoothing() {
		let mut value = ImportanceValue::default();
		value.update(1.0, TrackerKind::ExponentialSmoothing, 0.5);
		value.update(1.0, TrackerKind::ExponentialSmoothing, 0.5);
		assert_eq!(value.value, 0.75);
		assert_eq!(value.last_marginal_contribution, 1.0);
		assert_eq!(value.n, 2);
	}
}
