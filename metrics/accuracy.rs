use super::{mean::Mean, StreamingMetric};

/// The accuracy is the proportion of instances where the predicted class equals the label. A missing prediction, which an untrained online model produces, counts as incorrect.
#[derive(Clone, Debug, Default)]
pub struct Accuracy(Mean);

pub struct AccuracyInput<'a> {
	pub prediction: Option<&'a str>,
	pub label: &'a str,
}

impl Accuracy {
	pub fn new() -> Self {
		Self::default()
	}
}

impl<'a> StreamingMetric<'a> for Accuracy {
	type Input = AccuracyInput<'a>;
	type Output = Option<f64>;

	fn update(&mut self, input: AccuracyInput<'a>) {
		let correct = input.prediction == Some(input.label);
		self.0.update(if correct { 1.0 } else { 0.0 })
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f64> {
		self.0.finalize()
	}
}

#[test]
fn test_accuracy() {
	let mut accuracy = Accuracy::new();
	accuracy.update(AccuracyInput {
		prediction: Some("cat"),
		label: "cat",
	});
	accuracy.update(AccuracyInput {
		prediction: Some("dog"),
		label: "cat",
	});
	accuracy.update(AccuracyInput {
		prediction: None,
		label: "dog",
	});
	accuracy.update(AccuracyInput {
		prediction: Some("dog"),
		label: "dog",
	});
	assert_eq!(accuracy.finalize(), Some(0.5));
}
