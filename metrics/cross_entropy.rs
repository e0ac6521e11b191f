use super::{mean::Mean, StreamingMetric};
use num_traits::clamp;
use std::collections::BTreeMap;

/// CrossEntropy is the log loss of a predicted class distribution. [Learn more](https://en.wikipedia.org/wiki/Cross_entropy#Cross-entropy_loss_function_and_logistic_regression).
#[derive(Clone, Debug, Default)]
pub struct CrossEntropy(Mean);

/// The input to [CrossEntropy](struct.CrossEntropy.html).
pub struct CrossEntropyInput<'a> {
	pub probabilities: &'a BTreeMap<String, f32>,
	pub label: &'a str,
}

impl<'a> StreamingMetric<'a> for CrossEntropy {
	type Input = CrossEntropyInput<'a>;
	type Output = Option<f64>;

	fn update(&mut self, input: CrossEntropyInput<'a>) {
		self.0
			.update(f64::from(cross_entropy(input.probabilities, input.label)))
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f64> {
		self.0.finalize()
	}
}

/// Compute the cross entropy of a single prediction. A class missing from `probabilities` has probability zero, which is clamped to `f32::EPSILON` so the loss stays finite.
pub fn cross_entropy(probabilities: &BTreeMap<String, f32>, label: &str) -> f32 {
	let probability = probabilities.get(label).copied().unwrap_or(0.0);
	let probability = clamp(probability, std::f32::EPSILON, 1.0 - std::f32::EPSILON);
	-probability.ln()
}

#[test]
fn test_cross_entropy() {
	let mut probabilities = BTreeMap::new();
	probabilities.insert("a".to_owned(), 0.25);
	probabilities.insert("b".to_owned(), 0.75);
	assert!((cross_entropy(&probabilities, "a") - 4.0f32.ln()).abs() < 1e-6);
	assert!((cross_entropy(&probabilities, "c") + std::f32::EPSILON.ln()).abs() < 1e-3);
	let mut metric = CrossEntropy::default();
	metric.update(CrossEntropyInput {
		probabilities: &probabilities,
		label: "a",
	});
	metric.update(CrossEntropyInput {
		probabilities: &probabilities,
		label: "a",
	});
	let loss = metric.finalize().unwrap();
	assert!((loss - 4.0f64.ln()).abs() < 1e-6);
}
