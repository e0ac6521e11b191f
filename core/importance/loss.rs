use sapling_tree::argmax;
use std::collections::BTreeMap;

/// The loss the importance of a feature is measured in. Lower is better.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Loss {
	/// 1 when the most probable class is not the label, 0 otherwise. An empty prediction counts as wrong.
	ZeroOne,
	/// The negative log of the probability assigned to the label.
	CrossEntropy,
}

impl Default for Loss {
	fn default() -> Self {
		Loss::ZeroOne
	}
}

impl Loss {
	pub fn compute(&self, probabilities: &BTreeMap<String, f32>, label: &str) -> f64 {
		match self {
			Loss::ZeroOne => {
				if argmax(probabilities) == Some(label) {
					0.0
				} else {
					1.0
				}
			}
			Loss::CrossEntropy => f64::from(sapling_metrics::cross_entropy(probabilities, label)),
		}
	}
}

#[test]
fn test_zero_one() {
	let probabilities = maplit::btreemap! { "a".to_owned() => 0.7, "b".to_owned() => 0.3 };
	assert_eq!(Loss::ZeroOne.compute(&probabilities, "a"), 0.0);
	assert_eq!(Loss::ZeroOne.compute(&probabilities, "b"), 1.0);
	assert_eq!(Loss::ZeroOne.compute(&BTreeMap::new(), "a"), 1.0);
}

#[test]
fn test_cross_entropy() {
	let probabilities = maplit::btreemap! { "a".to_owned() => 0.5, "b".to_owned() => 0.5 };
	let loss = Loss::CrossEntropy.compute(&probabilities, "a");
	assert!((loss - 2f64.ln()).abs() < 1e-6);
	assert!(Loss::CrossEntropy.compute(&BTreeMap::new(), "a") > 10.0);
}
