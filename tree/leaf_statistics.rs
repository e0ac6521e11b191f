use crate::{
	features::{ClassCounts, Features, Value},
	gaussian::GaussianEstimator,
};
use std::collections::BTreeMap;

/// The sufficient statistics a leaf accumulates from the instances routed to it since it became a leaf. They are used to evaluate candidate splits and are discarded whenever the node stops being this leaf, so a new leaf always starts with empty statistics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LeafStatistics {
	total_weight: f64,
	class_counts: ClassCounts,
	features: BTreeMap<String, FeatureStatistics>,
}

/// The statistics for one feature. The kind is fixed by the first non-missing value the leaf sees for the feature.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureStatistics {
	Number(NumberStatistics),
	Enum(EnumStatistics),
}

/// A Gaussian estimator per class.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumberStatistics {
	pub estimators: BTreeMap<String, GaussianEstimator>,
}

/// The class counts per enum option.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumStatistics {
	pub class_counts: BTreeMap<String, ClassCounts>,
}

impl LeafStatistics {
	pub fn new() -> Self {
		Self::default()
	}

	/// Update the statistics with one instance. Missing values, and values whose kind does not match the kind already recorded for the feature, are skipped for that feature but the instance still counts toward the totals.
	pub fn update(&mut self, features: &Features, label: &str, weight: f64) {
		self.total_weight += weight;
		*self.class_counts.entry(label.to_owned()).or_insert(0.0) += weight;
		for (feature, value) in features.iter() {
			if value.is_missing() {
				continue;
			}
			if let Some(statistics) = self.features.get_mut(feature) {
				statistics.update(value, label, weight);
			} else {
				let mut statistics = FeatureStatistics::for_value(value);
				statistics.update(value, label, weight);
				self.features.insert(feature.clone(), statistics);
			}
		}
	}

	pub fn total_weight(&self) -> f64 {
		self.total_weight
	}

	pub fn class_counts(&self) -> &ClassCounts {
		&self.class_counts
	}

	pub fn features(&self) -> &BTreeMap<String, FeatureStatistics> {
		&self.features
	}

	pub fn get(&self, feature: &str) -> Option<&FeatureStatistics> {
		self.features.get(feature)
	}

	pub fn is_empty(&self) -> bool {
		self.total_weight <= 0.0
	}

	/// A leaf is pure when fewer than two classes have been observed at it.
	pub fn is_pure(&self) -> bool {
		self.class_counts.values().filter(|count| **count > 0.0).count() < 2
	}
}

impl FeatureStatistics {
	fn for_value(value: &Value) -> Self {
		match value {
			Value::Number(_) => FeatureStatistics::Number(NumberStatistics::default()),
			Value::Enum(_) => FeatureStatistics::Enum(EnumStatistics::default()),
		}
	}

	fn update(&mut self, value: &Value, label: &str, weight: f64) {
		match (self, value) {
			(FeatureStatistics::Number(statistics), Value::Number(value)) => {
				statistics.update(*value, label, weight)
			}
			(FeatureStatistics::Enum(statistics), Value::Enum(value)) => {
				statistics.update(value, label, weight)
			}
			_ => {}
		}
	}
}

impl NumberStatistics {
	fn update(&mut self, value: f32, label: &str, weight: f64) {
		if let Some(estimator) = self.estimators.get_mut(label) {
			estimator.update(value, weight);
		} else {
			let mut estimator = GaussianEstimator::new();
			estimator.update(value, weight);
			self.estimators.insert(label.to_owned(), estimator);
		}
	}

	/// The smallest and largest values seen across all classes.
	pub fn range(&self) -> Option<(f32, f32)> {
		self.estimators
			.values()
			.filter(|estimator| estimator.weight() > 0.0)
			.fold(None, |range, estimator| match range {
				None => Some((estimator.min(), estimator.max())),
				Some((min, max)) => Some((min.min(estimator.min()), max.max(estimator.max()))),
			})
	}
}

impl EnumStatistics {
	fn update(&mut self, option: &str, label: &str, weight: f64) {
		if !self.class_counts.contains_key(option) {
			self.class_counts.insert(option.to_owned(), ClassCounts::new());
		}
		if let Some(class_counts) = self.class_counts.get_mut(option) {
			*class_counts.entry(label.to_owned()).or_insert(0.0) += weight;
		}
	}
}
