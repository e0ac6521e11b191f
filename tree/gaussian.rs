use sapling_metrics::{m2_to_variance, merge_mean_m2};

/// A weighted running estimate of a normal distribution, along with the smallest and largest values seen. Leaves keep one per class for every number feature and use it to estimate how a threshold would divide that class.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianEstimator {
	weight: f64,
	mean: f64,
	m2: f64,
	min: f32,
	max: f32,
}

impl Default for GaussianEstimator {
	fn default() -> Self {
		Self {
			weight: 0.0,
			mean: 0.0,
			m2: 0.0,
			min: std::f32::INFINITY,
			max: std::f32::NEG_INFINITY,
		}
	}
}

impl GaussianEstimator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn update(&mut self, value: f32, weight: f64) {
		let (mean, m2) = merge_mean_m2(
			self.weight,
			self.mean,
			self.m2,
			weight,
			f64::from(value),
			0.0,
		);
		self.weight += weight;
		self.mean = mean;
		self.m2 = m2;
		self.min = self.min.min(value);
		self.max = self.max.max(value);
	}

	pub fn weight(&self) -> f64 {
		self.weight
	}

	pub fn mean(&self) -> f64 {
		self.mean
	}

	pub fn variance(&self) -> f64 {
		m2_to_variance(self.m2, self.weight)
	}

	pub fn min(&self) -> f32 {
		self.min
	}

	pub fn max(&self) -> f32 {
		self.max
	}

	/// The estimated probability that a value is <= `value`. With zero variance the distribution is a step at the mean.
	pub fn cdf(&self, value: f64) -> f64 {
		let std = self.variance().sqrt();
		if std <= 0.0 {
			return if value >= self.mean { 1.0 } else { 0.0 };
		}
		0.5 * (1.0 + erf((value - self.mean) / (std * std::f64::consts::SQRT_2)))
	}

	/// Estimate how much of this estimator's weight lies at or below and above `split_value`. Thresholds outside the observed range send all the weight to one side.
	pub fn split_weights(&self, split_value: f32) -> (f64, f64) {
		if self.weight <= 0.0 {
			(0.0, 0.0)
		} else if split_value < self.min {
			(0.0, self.weight)
		} else if split_value >= self.max {
			(self.weight, 0.0)
		} else {
			let left = (self.cdf(f64::from(split_value)) * self.weight).max(0.0).min(self.weight);
			(left, self.weight - left)
		}
	}
}

/// The error function, using the Abramowitz and Stegun approximation 7.1.26, which has a maximum absolute error of 1.5e-7.
fn erf(x: f64) -> f64 {
	let sign = if x < 0.0 { -1.0 } else { 1.0 };
	let x = x.abs();
	let t = 1.0 / (1.0 + 0.327_591_1 * x);
	let y = 1.0
		- (((((1.061_405_429 * t - 1.453_152_027) * t) + 1.421_413_741) * t - 0.284_496_736) * t
			+ 0.254_829_592)
			* t * (-x * x).exp();
	sign * y
}

#[test]
fn test_gaussian_estimator() {
	let mut estimator = GaussianEstimator::new();
	for value in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
		estimator.update(*value, 1.0);
	}
	assert_eq!(estimator.weight(), 8.0);
	assert!((estimator.mean() - 5.0).abs() < 1e-12);
	assert!((estimator.variance() - 32.0 / 7.0).abs() < 1e-9);
	assert_eq!(estimator.min(), 2.0);
	assert_eq!(estimator.max(), 9.0);
	assert!((estimator.cdf(5.0) - 0.5).abs() < 1e-6);
}

#[test]
fn test_split_weights() {
	let mut estimator = GaussianEstimator::new();
	estimator.update(1.0, 1.0);
	estimator.update(3.0, 1.0);
	assert_eq!(estimator.split_weights(0.5), (0.0, 2.0));
	assert_eq!(estimator.split_weights(3.0), (2.0, 0.0));
	let (left, right) = estimator.split_weights(2.0);
	assert!((left - 1.0).abs() < 1e-6);
	assert!((right - 1.0).abs() < 1e-6);
	assert_eq!(GaussianEstimator::new().split_weights(1.0), (0.0, 0.0));
}

#[test]
fn test_erf() {
	assert!(erf(0.0).abs() < 1e-7);
	assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
	assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
}
