/*!
This module defines the values an instance is made of. An instance is a map from feature name to [`Value`](enum.Value.html). A feature that is absent from the map, or a number that is `NaN`, is missing.
*/

use num_traits::ToPrimitive;
use std::collections::BTreeMap;

/// The features of a single instance. The map is ordered so that every pass over the features of an instance visits them in the same order.
pub type Features = BTreeMap<String, Value>;

/// A table of (possibly fractional) weights per class label.
pub type ClassCounts = BTreeMap<String, f64>;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Number(f32),
	Enum(String),
}

impl Value {
	/// Return the number if this is a `Number` that is not `NaN`.
	pub fn as_number(&self) -> Option<f32> {
		match self {
			Value::Number(value) if !value.is_nan() => Some(*value),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<&str> {
		match self {
			Value::Enum(value) => Some(value.as_str()),
			_ => None,
		}
	}

	pub fn is_missing(&self) -> bool {
		matches!(self, Value::Number(value) if value.is_nan())
	}
}

impl From<f32> for Value {
	fn from(value: f32) -> Self {
		Value::Number(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Enum(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Enum(value)
	}
}

impl std::fmt::Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Value::Number(value) => write!(f, "{}", value),
			Value::Enum(value) => write!(f, "{}", value),
		}
	}
}

/// Normalize a table of class counts into a probability distribution. `smoothing` is added to every class's count (Laplace smoothing). An empty or all-zero table produces an empty distribution.
pub fn normalize(class_counts: &ClassCounts, smoothing: f64) -> BTreeMap<String, f32> {
	let n_classes = class_counts.len().to_f64().unwrap_or(0.0);
	let total = class_counts.values().sum::<f64>() + smoothing * n_classes;
	if total <= 0.0 {
		return BTreeMap::new();
	}
	class_counts
		.iter()
		.map(|(class, count)| (class.clone(), ((count + smoothing) / total) as f32))
		.collect()
}

/// Return the class with the highest probability. Ties go to the lowest label, since the map is iterated in label order and only a strictly greater probability replaces the current best.
pub fn argmax(probabilities: &BTreeMap<String, f32>) -> Option<&str> {
	let mut best: Option<(&str, f32)> = None;
	for (class, probability) in probabilities.iter() {
		match best {
			Some((_, best_probability)) if *probability <= best_probability => {}
			_ => best = Some((class.as_str(), *probability)),
		}
	}
	best.map(|(class, _)| class)
}

/// Add every count in `other` to `class_counts`.
pub fn add_class_counts(class_counts: &mut ClassCounts, other: &ClassCounts) {
	for (class, count) in other.iter() {
		*class_counts.entry(class.clone()).or_insert(0.0) += count;
	}
}

#[test]
fn test_normalize() {
	let mut class_counts = ClassCounts::new();
	class_counts.insert("a".to_owned(), 3.0);
	class_counts.insert("b".to_owned(), 1.0);
	let probabilities = normalize(&class_counts, 0.0);
	assert_eq!(probabilities["a"], 0.75);
	assert_eq!(probabilities["b"], 0.25);
	let smoothed = normalize(&class_counts, 1.0);
	assert_eq!(smoothed["a"], 4.0 / 6.0);
	assert!(normalize(&ClassCounts::new(), 1.0).is_empty());
}

#[test]
fn test_argmax_ties_go_to_the_lowest_label() {
	let mut probabilities = BTreeMap::new();
	probabilities.insert("b".to_owned(), 0.4);
	probabilities.insert("c".to_owned(), 0.4);
	probabilities.insert("a".to_owned(), 0.2);
	assert_eq!(argmax(&probabilities), Some("b"));
	assert_eq!(argmax(&BTreeMap::new()), None);
}

#[test]
fn test_nan_is_missing() {
	assert_eq!(Value::Number(std::f32::NAN).as_number(), None);
	assert!(Value::Number(std::f32::NAN).is_missing());
	assert_eq!(Value::from(1.5).as_number(), Some(1.5));
	assert_eq!(Value::from("red").as_enum(), Some("red"));
	assert_eq!(Value::from("red").as_number(), None);
}
