/*!
This crate defines the [`StreamingMetric`](trait.StreamingMetric.html) trait and the handful of metrics the online tree needs: [`Mean`](struct.Mean.html), [`Accuracy`](struct.Accuracy.html), and [`CrossEntropy`](struct.CrossEntropy.html), along with [`merge_mean_m2`](fn.merge_mean_m2.html) for combining running means and variances.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod accuracy;
mod cross_entropy;
mod mean;
mod mean_variance;

pub use self::accuracy::{Accuracy, AccuracyInput};
pub use self::cross_entropy::{cross_entropy, CrossEntropy, CrossEntropyInput};
pub use self::mean::Mean;
pub use self::mean_variance::{m2_to_variance, merge_mean_m2};

/**
The `StreamingMetric` trait defines a common interface to metrics that are computed one observation at a time, which is the only way an online learner ever sees its data.

After being initialized, a value of type `T` implementing the `StreamingMetric` trait can have `update()` called on it with values of the associated type `Input`. Multiple values of `T` can be merged together by calling `merge()`. When finished aggregating, you can call `finalize()` on the metric to produce the associated type `Output`.

# Examples

Here is a basic example implementation of a `Max` metric, which takes `f64`s as input and produces an `f64` as output that is the maximum of all the inputs.

```
use sapling_metrics::StreamingMetric;

struct Max(f64);

impl StreamingMetric<'_> for Max {
	type Input = f64;
	type Output = f64;
	fn update(&mut self, input: Self::Input) {
		self.0 = self.0.max(input)
	}
	fn merge(&mut self, other: Self) { self.0 = self.0.max(other.0) }
	fn finalize(self) -> Self::Output { self.0 }
}
```

The generic lifetime `'a` allows `Input`s to borrow from their enclosing scope, for example a map of class probabilities.
*/
pub trait StreamingMetric<'a> {
	/// `Input` is the type to aggregate in calls to `update()`.
	type Input;
	/// `Output` is the return type of `finalize()`.
	type Output;
	/// Update this streaming metric with the `Input` `input`.
	fn update(&mut self, input: Self::Input);
	/// Merge multiple independently computed streaming metrics.
	fn merge(&mut self, other: Self);
	/// When you are done aggregating `Input`s, call `finalize()` to produce an `Output`.
	fn finalize(self) -> Self::Output;
}
