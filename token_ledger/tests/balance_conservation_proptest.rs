/// Property-based tests for balance conservation using proptest
///
/// Random sequences of earns and spends are replayed against a fresh store;
/// the final balance must equal the sum of successful earns minus the sum of
/// successful spends, and no intermediate balance may go negative.
use proptest::prelude::*;
use token_ledger::{LedgerError, LedgerStore};

#[derive(Debug, Clone)]
enum Op {
    Earn(String, i64),
    Spend(String, i64),
}

// Strategy to generate a token from a small alphabet so postings collide
fn token_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("RACKDOG"), Just("XP"), Just("xp")].prop_map(str::to_string)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (token_strategy(), 1i64..=500).prop_map(|(t, a)| Op::Earn(t, a)),
        (token_strategy(), 1i64..=500).prop_map(|(t, a)| Op::Spend(t, a)),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

proptest! {
    #[test]
    fn test_balance_equals_successful_earns_minus_spends(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let rt = runtime();
        let store = LedgerStore::in_memory();
        rt.block_on(async {
            store.register_integration("g1", "Ghost Ops", "co1").await.unwrap();
            store.register_player("g1", "p1", None).await.unwrap();
        });

        let mut expected = std::collections::BTreeMap::<String, i64>::new();

        for op in &ops {
            match op {
                Op::Earn(token, amount) => {
                    let player = rt.block_on(store.earn("g1", "p1", token, *amount, "prop")).unwrap();
                    *expected.entry(token.clone()).or_default() += amount;
                    prop_assert_eq!(player.balance(token), expected[token]);
                }
                Op::Spend(token, amount) => {
                    let before = expected.get(token).copied().unwrap_or(0);
                    match rt.block_on(store.spend("g1", "p1", token, *amount, "prop")) {
                        Ok(player) => {
                            prop_assert!(before >= *amount, "spend succeeded without funds");
                            *expected.entry(token.clone()).or_default() -= amount;
                            prop_assert_eq!(player.balance(token), expected[token]);
                        }
                        Err(LedgerError::InsufficientFunds { available, required, .. }) => {
                            prop_assert!(before < *amount, "spend rejected despite funds");
                            prop_assert_eq!(available, before);
                            prop_assert_eq!(required, *amount);
                        }
                        Err(e) => prop_assert!(false, "unexpected error: {}", e),
                    }
                }
            }
        }

        let player = rt.block_on(store.get_player("g1", "p1")).unwrap();
        for (token, amount) in &expected {
            prop_assert!(*amount >= 0, "balance went negative");
            prop_assert_eq!(player.balance(token), *amount);
        }

        let history = rt.block_on(store.history("g1", "p1", 1000)).unwrap();
        let journal_total: i64 = history.iter().map(|e| e.amount).sum();
        let expected_total: i64 = expected.values().sum();
        prop_assert_eq!(journal_total, expected_total);
    }

    #[test]
    fn test_non_positive_amounts_always_rejected(amount in i64::MIN..=0, token in token_strategy()) {
        let rt = runtime();
        let store = LedgerStore::in_memory();
        rt.block_on(async {
            store.register_integration("g1", "Ghost Ops", "co1").await.unwrap();
            store.register_player("g1", "p1", None).await.unwrap();
        });

        let earn = rt.block_on(store.earn("g1", "p1", &token, amount, "prop"));
        prop_assert!(matches!(earn, Err(LedgerError::Validation(_))));
        let spend = rt.block_on(store.spend("g1", "p1", &token, amount, "prop"));
        prop_assert!(matches!(spend, Err(LedgerError::Validation(_))));

        let player = rt.block_on(store.get_player("g1", "p1")).unwrap();
        prop_assert!(player.balances.is_empty());
    }
}
