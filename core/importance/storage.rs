use num_traits::ToPrimitive;
use rand::Rng;
use rand_xoshiro::Xoshiro256Plus;
use sapling_tree::Features;
use std::collections::VecDeque;

/// A bounded memory of past instances, which the imputer draws replacement values from. Any randomness comes from the generator owned by the importance estimator, so a storage has no state of its own that depends on a seed.
pub trait Storage: std::fmt::Debug + Send {
	/// Offer an instance to the storage. Whether and where it is kept depends on the policy.
	fn update(&mut self, features: &Features, rng: &mut Xoshiro256Plus);
	fn len(&self) -> usize;
	fn is_empty(&self) -> bool {
		self.len() == 0
	}
	fn get(&self, index: usize) -> Option<&Features>;
}

/// Every instance seen so far is equally likely to be in the reservoir. Replacements are scheduled with Algorithm L, which skips ahead by a geometrically distributed number of instances instead of drawing for every one.
#[derive(Debug)]
pub struct UniformReservoir {
	size: usize,
	instances: Vec<Features>,
	n_seen: u64,
	w: f64,
	next_replacement: Option<u64>,
}

impl UniformReservoir {
	pub fn new(size: usize) -> Self {
		Self {
			size,
			instances: Vec::with_capacity(size),
			n_seen: 0,
			w: 1.0,
			next_replacement: None,
		}
	}

	fn skip(&self, rng: &mut Xoshiro256Plus) -> u64 {
		let skip = (open_unit(rng).ln() / (1.0 - self.w).ln()).floor();
		skip.to_u64().unwrap_or(std::u64::MAX / 2) + 1
	}

	fn shrink_w(&mut self, rng: &mut Xoshiro256Plus) {
		let size = self.size.to_f64().unwrap_or(1.0);
		self.w *= (open_unit(rng).ln() / size).exp();
	}
}

impl Storage for UniformReservoir {
	fn update(&mut self, features: &Features, rng: &mut Xoshiro256Plus) {
		if self.next_replacement.is_none() {
			self.shrink_w(rng);
			self.next_replacement = Some(self.size as u64 + self.skip(rng));
		}
		self.n_seen += 1;
		if self.instances.len() < self.size {
			self.instances.push(features.clone());
			return;
		}
		if self.next_replacement != Some(self.n_seen) {
			return;
		}
		let index = rng.gen_range(0, self.size);
		self.instances[index] = features.clone();
		// The next skip is drawn from the shrunk W.
		self.shrink_w(rng);
		let skip = self.skip(rng);
		self.next_replacement = Some(self.n_seen.saturating_add(skip));
	}

	fn len(&self) -> usize {
		self.instances.len()
	}

	fn get(&self, index: usize) -> Option<&Features> {
		self.instances.get(index)
	}
}

/// Once full, each new instance replaces a random slot with a constant probability, so older instances are forgotten geometrically.
#[derive(Debug)]
pub struct GeometricReservoir {
	size: usize,
	replacement_probability: f64,
	instances: Vec<Features>,
}

impl GeometricReservoir {
	/// When `replacement_probability` is `None` it is `1 / size`.
	pub fn new(size: usize, replacement_probability: Option<f64>) -> Self {
		let replacement_probability = replacement_probability
			.unwrap_or_else(|| 1.0 / size.to_f64().unwrap_or(1.0).max(1.0));
		Self {
			size,
			replacement_probability,
			instances: Vec::with_capacity(size),
		}
	}

	pub fn replacement_probability(&self) -> f64 {
		self.replacement_probability
	}
}

impl Storage for GeometricReservoir {
	fn update(&mut self, features: &Features, rng: &mut Xoshiro256Plus) {
		if self.instances.len() < self.size {
			self.instances.push(features.clone());
		} else if rng.gen::<f64>() <= self.replacement_probability {
			let index = rng.gen_range(0, self.size);
			self.instances[index] = features.clone();
		}
	}

	fn len(&self) -> usize {
		self.instances.len()
	}

	fn get(&self, index: usize) -> Option<&Features> {
		self.instances.get(index)
	}
}

/// The most recent `size` instances.
#[derive(Debug)]
pub struct SlidingWindow {
	size: usize,
	instances: VecDeque<Features>,
}

impl SlidingWindow {
	pub fn new(size: usize) -> Self {
		Self {
			size,
			instances: VecDeque::with_capacity(size),
		}
	}
}

impl Storage for SlidingWindow {
	fn update(&mut self, features: &Features, _rng: &mut Xoshiro256Plus) {
		if self.size == 0 {
			return;
		}
		if self.instances.len() == self.size {
			self.instances.pop_front();
		}
		self.instances.push_back(features.clone());
	}

	fn len(&self) -> usize {
		self.instances.len()
	}

	fn get(&self, index: usize) -> Option<&Features> {
		self.instances.get(index)
	}
}

/// A uniform sample from (0, 1], which is safe to take the log of.
fn open_unit(rng: &mut Xoshiro256Plus) -> f64 {
	1.0 - rng.gen::<f64>()
}

#[cfg(test)]
mod test {
	use super::*;
	use maplit::btreemap;
	use rand::SeedableRng;
	use sapling_tree::Value;

	fn instance(index: usize) -> Features {
		btreemap! { "i".to_owned() => Value::Number(index as f32) }
	}

	fn index_of(features: &Features) -> usize {
		features["i"].as_number().unwrap() as usize
	}

	#[test]
	fn test_sliding_window() {
		let mut rng = Xoshiro256Plus::seed_from_u64(0);
		let mut storage = SlidingWindow::new(3);
		assert!(storage.is_empty());
		for index in 0..5 {
			storage.update(&instance(index), &mut rng);
		}
		assert_eq!(storage.len(), 3);
		let kept: Vec<usize> = (0..3).map(|i| index_of(storage.get(i).unwrap())).collect();
		assert_eq!(kept, vec![2, 3, 4]);
	}

	#[test]
	fn test_geometric_reservoir() {
		let mut rng = Xoshiro256Plus::seed_from_u64(0);
		let mut storage = GeometricReservoir::new(10, None);
		assert_eq!(storage.replacement_probability(), 0.1);
		for index in 0..1000 {
			storage.update(&instance(index), &mut rng);
		}
		assert_eq!(storage.len(), 10);
		let n_replaced = (0..10)
			.filter(|i| index_of(storage.get(*i).unwrap()) >= 10)
			.count();
		assert!(n_replaced > 0);
		let mut never = GeometricReservoir::new(10, Some(0.0));
		for index in 0..1000 {
			never.update(&instance(index), &mut rng);
		}
		let kept: Vec<usize> = (0..10).map(|i| index_of(never.get(i).unwrap())).collect();
		assert_eq!(kept, (0..10).collect::<Vec<_>>());
	}

	#[test]
	fn test_uniform_reservoir() {
		let mut rng = Xoshiro256Plus::seed_from_u64(0);
		let mut storage = UniformReservoir::new(100);
		for index in 0..10_000 {
			storage.update(&instance(index), &mut rng);
		}
		assert_eq!(storage.len(), 100);
		// A uniform sample of 0..10000 has a mean near 5000.
		let mean = (0..100)
			.map(|i| index_of(storage.get(i).unwrap()) as f64)
			.sum::<f64>()
			/ 100.0;
		assert!(mean > 3500.0 && mean < 6500.0, "mean was {}", mean);
		assert!(storage.get(100).is_none());
	}

	#[test]
	fn test_uniform_reservoir_skips_with_the_updated_w() {
		let mut rng = Xoshiro256Plus::seed_from_u64(3);
		let mut storage = UniformReservoir::new(10);
		let mut index = 0;
		while storage.instances.len() < storage.size
			|| storage.next_replacement != Some(storage.n_seen + 1)
		{
			storage.update(&instance(index), &mut rng);
			index += 1;
			assert!(index < 100_000, "no replacement was scheduled");
		}
		// Replay the draws the replacement makes: the slot, then W, then the skip.
		let mut replay = rng.clone();
		let slot = replay.gen_range(0, 10);
		let w = storage.w * (open_unit(&mut replay).ln() / 10.0).exp();
		let skip = (open_unit(&mut replay).ln() / (1.0 - w).ln()).floor() as u64 + 1;
		let n_seen = storage.n_seen + 1;
		storage.update(&instance(index), &mut rng);
		assert_eq!(storage.n_seen, n_seen);
		assert_eq!(storage.w, w);
		assert_eq!(storage.next_replacement, Some(n_seen + skip));
		assert_eq!(index_of(storage.get(slot).unwrap()), index);
	}

	#[test]
	fn test_same_seed_same_contents() {
		let run = || {
			let mut rng = Xoshiro256Plus::seed_from_u64(7);
			let mut storage = UniformReservoir::new(5);
			for index in 0..500 {
				storage.update(&instance(index), &mut rng);
			}
			(0..5)
				.map(|i| index_of(storage.get(i).unwrap()))
				.collect::<Vec<_>>()
		};
		assert_eq!(run(), run());
	}
}
