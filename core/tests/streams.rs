use maplit::btreemap;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use sapling_core::{importance::ImportanceOptions, HoeffdingPruningTree, Options, PruneSchedule, PrunerKind};
use sapling_tree::{Features, Node, Value};

/// A value in [0, 0.4] for label "0" and in [0.6, 1] for label "1".
fn margin(rng: &mut Xoshiro256Plus, label: bool) -> f32 {
	let u: f32 = rng.gen();
	if label {
		0.6 + 0.4 * u
	} else {
		0.4 * u
	}
}

fn label_str(label: bool) -> &'static str {
	if label {
		"1"
	} else {
		"0"
	}
}

/// The label is carried by `a` and `b` is noise.
fn separable_instance(rng: &mut Xoshiro256Plus) -> (Features, &'static str) {
	let label: bool = rng.gen();
	let a = margin(rng, label);
	let b: f32 = rng.gen();
	let features = btreemap! {
		"a".to_owned() => Value::Number(a),
		"b".to_owned() => Value::Number(b),
	};
	(features, label_str(label))
}

/// Before `drift_at` the label is carried by `a`, and afterward by `c`. `b` is always noise.
fn drifting_instance(rng: &mut Xoshiro256Plus, index: usize, drift_at: usize) -> (Features, &'static str) {
	let label: bool = rng.gen();
	let (a, c) = if index < drift_at {
		(margin(rng, label), rng.gen())
	} else {
		(rng.gen(), margin(rng, label))
	};
	let b: f32 = rng.gen();
	let features = btreemap! {
		"a".to_owned() => Value::Number(a),
		"b".to_owned() => Value::Number(b),
		"c".to_owned() => Value::Number(c),
	};
	(features, label_str(label))
}

fn root_feature(model: &HoeffdingPruningTree) -> Option<String> {
	match model.tree().node(0) {
		Some(Node::Branch(branch)) => Some(branch.split.feature().to_owned()),
		_ => None,
	}
}

fn drift_options(pruner: PrunerKind) -> Options {
	Options {
		pruner,
		importance: ImportanceOptions {
			smoothing_rate: 0.01,
			..ImportanceOptions::default()
		},
		..Options::default()
	}
}

#[test]
fn test_noise_is_pruned_and_the_tree_stays_small() {
	let mut rng = Xoshiro256Plus::seed_from_u64(42);
	let mut model = HoeffdingPruningTree::new(Options::default()).unwrap();
	for index in 0..10_000 {
		let (features, label) = separable_instance(&mut rng);
		model.learn_one(&features, label).unwrap();
		if index >= 5_000 {
			assert!(model.tree().n_nodes() <= 5);
			let b = model.importance_values()["b"];
			assert!(b.abs() <= 0.01, "importance of b was {}", b);
		}
	}
	assert_eq!(root_feature(&model), Some("a".to_owned()));
	assert!(model.important_features().contains("a"));
	assert!(!model.important_features().contains("b"));
	assert!(!model.tree().split_features().contains("b"));
	assert_eq!(model.n_instances_seen(), 10_000);
	assert_eq!(model.n_prunes(), 10_000);
	assert!(model.prequential_accuracy().unwrap() > 0.9);
	let (features, _) = separable_instance(&mut rng);
	assert_eq!(
		model.predict_proba_one(&features),
		model.predict_proba_one(&features)
	);
	let low = btreemap! { "a".to_owned() => Value::Number(0.1), "b".to_owned() => Value::Number(0.9) };
	let high = btreemap! { "a".to_owned() => Value::Number(0.9), "b".to_owned() => Value::Number(0.1) };
	assert_eq!(model.predict_one(&low), Some("0".to_owned()));
	assert_eq!(model.predict_one(&high), Some("1".to_owned()));
}

#[test]
fn test_drift_moves_the_root_to_the_new_feature() {
	let drift_at = 5_000;
	let mut rng = Xoshiro256Plus::seed_from_u64(7);
	let mut model = HoeffdingPruningTree::new(drift_options(PrunerKind::Complete)).unwrap();
	let mut c_became_important_at = None;
	for index in 0..15_000 {
		let (features, label) = drifting_instance(&mut rng, index, drift_at);
		model.learn_one(&features, label).unwrap();
		if index + 1 == drift_at {
			assert_eq!(root_feature(&model), Some("a".to_owned()));
		}
		if c_became_important_at.is_none()
			&& index >= drift_at
			&& model.importance_values()["c"] >= 0.05
		{
			c_became_important_at = Some(index);
		}
	}
	let c_became_important_at = c_became_important_at.expect("c never became important");
	assert!(c_became_important_at < drift_at + 5_000);
	assert_eq!(root_feature(&model), Some("c".to_owned()));
	assert!(model.importance_values()["a"] < 0.05);
	assert!(model.n_branches_pruned() > 0);
}

#[test]
fn test_selective_keeps_at_least_as_many_nodes_as_complete() {
	let drift_at = 5_000;
	let run = |pruner| {
		let mut rng = Xoshiro256Plus::seed_from_u64(7);
		let mut model = HoeffdingPruningTree::new(drift_options(pruner)).unwrap();
		for index in 0..15_000 {
			let (features, label) = drifting_instance(&mut rng, index, drift_at);
			model.learn_one(&features, label).unwrap();
		}
		model.tree().n_nodes()
	};
	assert!(run(PrunerKind::Selective) >= run(PrunerKind::Complete));
}

#[test]
fn test_same_seed_same_model() {
	let drift_at = 1_500;
	let mut first = HoeffdingPruningTree::new(drift_options(PrunerKind::Complete)).unwrap();
	let mut second = HoeffdingPruningTree::new(drift_options(PrunerKind::Complete)).unwrap();
	let mut rng = Xoshiro256Plus::seed_from_u64(3);
	for index in 0..3_000 {
		let (features, label) = drifting_instance(&mut rng, index, drift_at);
		first.learn_one(&features, label).unwrap();
		second.learn_one(&features, label).unwrap();
		assert_eq!(first.importance_values(), second.importance_values());
		assert_eq!(first.tree().to_string(), second.tree().to_string());
	}
}

#[test]
fn test_node_count_only_grows_through_splits() {
	let drift_at = 2_000;
	let mut rng = Xoshiro256Plus::seed_from_u64(11);
	let mut model = HoeffdingPruningTree::new(Options {
		prune_schedule: PruneSchedule::Every { n_instances: 50 },
		..drift_options(PrunerKind::Complete)
	})
	.unwrap();
	let mut last_pass: Option<(u64, usize)> = None;
	for index in 0..6_000 {
		let (features, label) = drifting_instance(&mut rng, index, drift_at);
		model.learn_one(&features, label).unwrap();
		if (index + 1) % 50 == 0 {
			let n_splits = model.tree().n_splits();
			let n_nodes = model.tree().n_nodes();
			if let Some((last_n_splits, last_n_nodes)) = last_pass {
				if n_splits == last_n_splits {
					assert!(n_nodes <= last_n_nodes);
				}
			}
			last_pass = Some((n_splits, n_nodes));
		}
	}
	assert_eq!(model.n_prunes(), 120);
}
