//! https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance#Parallel_algorithm

/// Combine two separately computed weighted means and sums of squared deviations into a single mean and M2. Adding a single observation `x` with weight `w` is `merge_mean_m2(n, mean, m2, w, x, 0.0)`.
pub fn merge_mean_m2(
	n_a: f64,
	mean_a: f64,
	m2_a: f64,
	n_b: f64,
	mean_b: f64,
	m2_b: f64,
) -> (f64, f64) {
	let n = n_a + n_b;
	if n <= 0.0 {
		return (0.0, 0.0);
	}
	let delta = mean_b - mean_a;
	(
		mean_a + delta * n_b / n,
		m2_a + m2_b + delta * delta * (n_a * n_b / n),
	)
}

/// The unbiased sample variance for M2 accumulated over `n` observations, or zero if there are fewer than two.
pub fn m2_to_variance(m2: f64, n: f64) -> f64 {
	if n > 1.0 {
		m2 / (n - 1.0)
	} else {
		0.0
	}
}

#[test]
fn test_merge_mean_m2_one_at_a_time() {
	let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
	let (mut n, mut mean, mut m2) = (0.0, 0.0, 0.0);
	for value in values.iter() {
		let (new_mean, new_m2) = merge_mean_m2(n, mean, m2, 1.0, *value, 0.0);
		n += 1.0;
		mean = new_mean;
		m2 = new_m2;
	}
	assert!((mean - 5.0).abs() < 1e-12);
	assert!((m2 - 32.0).abs() < 1e-9);
	assert!((m2_to_variance(m2, n) - 32.0 / 7.0).abs() < 1e-9);
}

#[test]
fn test_merge_mean_m2_empty() {
	assert_eq!(merge_mean_m2(0.0, 0.0, 0.0, 0.0, 0.0, 0.0), (0.0, 0.0));
	assert_eq!(m2_to_variance(0.0, 1.0), 0.0);
}
