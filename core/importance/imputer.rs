use super::storage::Storage;
use rand::Rng;
use rand_xoshiro::Xoshiro256Plus;
use sapling_tree::Value;
use thiserror::Error;

/// A draw that could not produce a replacement value. The estimator skips the draw.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SampleError {
	#[error("the sampling memory is empty")]
	EmptySamplingMemory,
	#[error("the sampled instance has no value for feature {0}")]
	MissingFeature(String),
}

/// An imputer produces a value for a feature to replace the observed one, breaking the feature's relationship with the label.
pub trait Imputer: std::fmt::Debug + Send {
	fn draw(
		&self,
		feature: &str,
		storage: &dyn Storage,
		rng: &mut Xoshiro256Plus,
	) -> Result<Value, SampleError>;
}

/// Draws the feature's value from a uniformly chosen instance in the storage, which samples from the feature's marginal distribution over the recent stream.
#[derive(Clone, Debug, Default)]
pub struct MarginalImputer;

impl Imputer for MarginalImputer {
	fn draw(
		&self,
		feature: &str,
		storage: &dyn Storage,
		rng: &mut Xoshiro256Plus,
	) -> Result<Value, SampleError> {
		if storage.is_empty() {
			return Err(SampleError::EmptySamplingMemory);
		}
		let index = rng.gen_range(0, storage.len());
		storage
			.get(index)
			.and_then(|features| features.get(feature))
			.cloned()
			.ok_or_else(|| SampleError::MissingFeature(feature.to_owned()))
	}
}
