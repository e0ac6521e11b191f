use super::StreamingMetric;

/// The arithmetic mean of a stream of values, updated incrementally so long streams do not accumulate a large sum.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mean {
	n: u64,
	mean: f64,
}

impl Mean {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn n(&self) -> u64 {
		self.n
	}

	/// The current mean, or `None` if no values have been observed.
	pub fn get(&self) -> Option<f64> {
		if self.n > 0 {
			Some(self.mean)
		} else {
			None
		}
	}
}

impl StreamingMetric<'_> for Mean {
	type Input = f64;
	type Output = Option<f64>;

	fn update(&mut self, value: f64) {
		self.n += 1;
		self.mean += (value - self.mean) / self.n as f64;
	}

	fn merge(&mut self, other: Self) {
		if other.n == 0 {
			return;
		}
		let n = self.n + other.n;
		self.mean = (self.mean * self.n as f64 + other.mean * other.n as f64) / n as f64;
		self.n = n;
	}

	fn finalize(self) -> Option<f64> {
		self.get()
	}
}

#[test]
fn test_mean() {
	let mut mean = Mean::new();
	assert_eq!(mean.get(), None);
	for value in &[1.0, 2.0, 3.0, 6.0] {
		mean.update(*value);
	}
	assert_eq!(mean.n(), 4);
	assert_eq!(mean.finalize(), Some(3.0));
}

#[test]
fn test_mean_merge() {
	let mut left = Mean::new();
	left.update(1.0);
	left.update(3.0);
	let mut right = Mean::new();
	right.update(8.0);
	left.merge(right);
	assert_eq!(left.get(), Some(4.0));
	left.merge(Mean::new());
	assert_eq!(left.get(), Some(4.0));
}
