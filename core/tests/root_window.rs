mod common;

use proptest::prelude::*;

use cipherpool_core::PoolParams;
use cipherpool_privacy::Address;

use common::*;

const WINDOW: usize = 5;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn root_known_iff_within_last_window(deposits in (WINDOW + 1)..(3 * WINDOW), seed in any::<u64>()) {
        let mut engine = engine_with(PoolParams::new(6, WINDOW, DENOMINATION, POOL), accept_all);
        let depositor = Address::from_low_u64(1);

        let mut roots = vec![engine.current_root()];
        for note in notes(seed, deposits) {
            fund_and_deposit(&mut engine, depositor, &note);
            roots.push(engine.current_root());
        }

        let retained = roots.len() - WINDOW;
        for (i, root) in roots.iter().enumerate() {
            prop_assert_eq!(engine.is_known_root(root), i >= retained, "root #{}", i);
        }
    }
}
