//! Property tests for poll backoff

use std::time::Duration;

use poidata::apify::{Backoff, MAX_INTERVAL};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn interval_never_exceeds_cap(initial_ms in 1u64..120_000, polls in 1usize..40) {
        let mut backoff = Backoff::new(Duration::from_millis(initial_ms), true);
        let mut previous = Duration::ZERO;
        for _ in 0..polls {
            let delay = backoff.next_delay();
            prop_assert!(delay <= MAX_INTERVAL);
            prop_assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn interval_is_constant_when_disabled(initial_ms in 1u64..60_000, polls in 1usize..40) {
        let initial = Duration::from_millis(initial_ms);
        let mut backoff = Backoff::new(initial, false);
        for _ in 0..polls {
            prop_assert_eq!(backoff.next_delay(), initial);
        }
    }
}

#[test]
fn test_default_sequence() {
    let mut backoff = Backoff::default();
    let secs: Vec<u64> = (0..4).map(|_| backoff.next_delay().as_secs()).collect();
    assert_eq!(secs, vec![1, 2, 4, 8]);
}
