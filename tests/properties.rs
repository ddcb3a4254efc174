// tests/properties.rs

mod common;

use common::{ConfigurationBuilder, plan};
use proptest::prelude::*;
use somaticdag::resources::normalize_threads;

proptest! {
    #[test]
    fn normalized_threads_fit_the_host(
        mem_per_thread in 1u64..20_000,
        requested in 1u32..64,
        host in 0u64..256_000,
        overhead in 0u64..64_000,
    ) {
        let available = host.saturating_sub(overhead);
        match normalize_threads(mem_per_thread, requested, host, overhead) {
            Ok(threads) => {
                prop_assert!(threads >= 1);
                prop_assert!(threads <= requested);
                if threads < requested {
                    prop_assert!(u64::from(threads) * mem_per_thread <= available);
                }
            }
            Err(_) => prop_assert!(available < mem_per_thread),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(4))]

    #[test]
    fn every_pair_gets_the_same_sub_graph(tumours in 1usize..4) {
        let graph = plan(&ConfigurationBuilder::new().with_tumours(tumours).build());
        let first = graph.pair_signature(0);
        for p in 1..tumours {
            prop_assert_eq!(&graph.pair_signature(p), &first);
        }
        prop_assert_eq!(graph.leaves().filter(|t| !graph.is_side_output(t)).count(), 1);
    }
}
