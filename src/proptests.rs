use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Arbitrary)]
enum Shape {
    /// One entry per bucket: every collision adds a hop.
    Narrow,
    Wide,
}

#[derive(Clone, Copy, Debug, Arbitrary)]
enum Reducer {
    Modulo,
    FastRange,
}

type Outcome = (u64, Option<u32>);

fn oracle_outcomes(oracle: &HashMap<u64, u32>, probes: &[u64]) -> Vec<Outcome> {
    let mut expected: Vec<Outcome> = probes.iter().map(|k| (*k, oracle.get(k).copied())).collect();
    expected.sort_unstable();
    expected
}

fn check_lookups<const B: usize, R: ReductionFn>(
    entries: &[(u64, u32)],
    capacity: usize,
    probes: &[u64],
    n_streams: usize,
) -> std::result::Result<(), TestCaseError> {
    let mut table = ChainedTable::<u64, u32, B, MurmurFinalizer, R>::new(capacity, MurmurFinalizer);
    let mut oracle = HashMap::new();
    for &(key, payload) in entries {
        let fresh = table.insert(key, payload).unwrap();
        prop_assert_eq!(fresh, !oracle.contains_key(&key));
        oracle.entry(key).or_insert(payload);
    }
    prop_assert_eq!(table.len(), oracle.len());

    let mut results = Vec::new();
    let stats = table.interleaved_multilookup(probes, &mut results, n_streams).unwrap();
    prop_assert_eq!(stats.tasks, probes.len());
    prop_assert!(stats.peak_outstanding <= n_streams);

    let mut got: Vec<Outcome> = results.iter().map(|r| (r.key(), r.payload().copied())).collect();
    got.sort_unstable();
    prop_assert_eq!(got, oracle_outcomes(&oracle, probes));
    Ok(())
}

fn entries_strategy() -> impl Strategy<Value = Vec<(u64, u32)>> {
    // Narrow key range so chains actually form.
    prop::collection::vec((0u64..4096, any::<u32>()), 0..=600)
}

fn probes_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..4096, 0..=400)
}

fn model_strategy() -> impl Strategy<Value = RmiHash<32>> {
    let leaf = (0.0f64..0.002, -0.5f64..0.5).prop_map(|(slope, intercept)| LinearModel::new(slope, intercept));
    (prop::collection::vec(leaf, 0..=32), 1usize..5000).prop_map(|(leaves, full_size)| {
        RmiHash::from_parts(LinearModel::through(0.0, 0.0, 4095.0, 1.0), leaves, full_size)
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_interleaved_lookup_matches_hashmap(
        entries in entries_strategy(),
        probes in probes_strategy(),
        capacity in 1usize..256,
        n_streams in 1usize..=MAX_CORO,
        shape in any::<Shape>(),
        reducer in any::<Reducer>(),
    ) {
        match (shape, reducer) {
            (Shape::Narrow, Reducer::Modulo) => check_lookups::<1, Modulo>(&entries, capacity, &probes, n_streams)?,
            (Shape::Narrow, Reducer::FastRange) => check_lookups::<1, FastRange>(&entries, capacity, &probes, n_streams)?,
            (Shape::Wide, Reducer::Modulo) => check_lookups::<4, Modulo>(&entries, capacity, &probes, n_streams)?,
            (Shape::Wide, Reducer::FastRange) => check_lookups::<4, FastRange>(&entries, capacity, &probes, n_streams)?,
        }
    }

    #[test]
    fn prop_single_stream_is_sequential(
        entries in entries_strategy(),
        probes in probes_strategy(),
        capacity in 1usize..64,
    ) {
        let mut table = ChainedTable::<u64, u32, 2, MultPrime64, FastRange>::new(capacity, MultPrime64);
        for &(key, payload) in &entries {
            table.insert(key, payload).unwrap();
        }

        let mut interleaved = Vec::new();
        let stats = table.interleaved_multilookup(&probes, &mut interleaved, 1).unwrap();
        prop_assert!(stats.peak_outstanding <= 1);
        let mut sequential = Vec::new();
        table.sequential_multilookup(&probes, &mut sequential).unwrap();
        prop_assert_eq!(interleaved, sequential);
    }

    #[test]
    fn prop_interleaved_hash_matches_sequential(
        model in model_strategy(),
        keys in prop::collection::vec(0u64..8192, 0..=400),
        n_streams in 1usize..=MAX_CORO,
    ) {
        let mut interleaved = Vec::new();
        let stats = model.interleaved_multihash(&keys, &mut interleaved, n_streams).unwrap();
        let expected_suspensions = if model.leaf_count() == 0 { 0 } else { keys.len() as u64 };
        prop_assert_eq!(stats.suspensions, expected_suspensions);
        prop_assert!(stats.peak_outstanding <= n_streams);

        let mut sequential = Vec::new();
        model.sequential_multihash(&keys, &mut sequential).unwrap();
        for r in &sequential {
            prop_assert!(r.hash() <= model.max_output());
        }

        let mut got: Vec<(u64, usize)> = interleaved.iter().map(|r| (r.key(), r.hash())).collect();
        let mut expected: Vec<(u64, usize)> = sequential.iter().map(|r| (r.key(), r.hash())).collect();
        got.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(got, expected);
    }
}

#[test]
fn every_stream_count_returns_every_key() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut table = ChainedTable::<u64, u32, 1, MurmurFinalizer, FastRange>::new(97, MurmurFinalizer);
    let mut oracle = HashMap::new();
    for _ in 0..800 {
        let key = rng.gen_range(0..2_000u64);
        let payload = rng.gen::<u32>();
        if table.insert(key, payload).unwrap() {
            oracle.insert(key, payload);
        }
    }
    let probes: Vec<u64> = (0..1_000).map(|_| rng.gen_range(0..4_000u64)).collect();
    let expected = oracle_outcomes(&oracle, &probes);

    for n_streams in 1..=MAX_CORO {
        let mut results = Vec::new();
        let stats = table.interleaved_multilookup(&probes, &mut results, n_streams).unwrap();
        assert_eq!(stats.peak_outstanding, n_streams.min(probes.len()));

        let mut got: Vec<Outcome> = results.iter().map(|r| (r.key(), r.payload().copied())).collect();
        got.sort_unstable();
        assert_eq!(got, expected, "n_streams={n_streams}");
    }
}

#[test]
fn out_of_range_stream_counts_run_nothing() {
    let table = ChainedTable::<u64, u32, 1, MurmurFinalizer, FastRange>::new(8, MurmurFinalizer);
    let model = RmiHash::<4>::from_parts(LinearModel::default(), Vec::new(), 8);
    for n_streams in [0, MAX_CORO + 1, usize::MAX] {
        let mut lookups = Vec::new();
        assert!(table.interleaved_multilookup(&[1, 2], &mut lookups, n_streams).is_err());
        assert!(lookups.is_empty());

        let mut hashes = Vec::new();
        assert!(model.interleaved_multihash(&[1u64, 2], &mut hashes, n_streams).is_err());
        assert!(hashes.is_empty());
    }
}
