//! # Conservation Properties
//!
//! Property sweeps over the ledger and the secure purchase engine: whatever
//! sequence of operations runs, balances keep summing to the minted supply
//! and never go negative through the checked paths.

#[cfg(test)]
mod tests {
    use hdm_market::prelude::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    const ACCOUNTS: [Address; 4] = [
        Address::new([0x01; 20]),
        Address::new([0x11; 20]),
        Address::new([0x22; 20]),
        Address::new([0x33; 20]),
    ];

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("test runtime")
    }

    proptest! {
        /// Arbitrary transfer sequences never break conservation or drive a
        /// balance negative — rejected transfers change nothing.
        #[test]
        fn transfer_sequences_conserve_supply(
            ops in prop::collection::vec((0usize..4, 0usize..4, 0i128..500), 1..40)
        ) {
            let ledger = BalanceLedger::new();
            ledger
                .mint_initial_supply(ACCOUNTS[0], Amount::new(1_000))
                .unwrap();

            for (from, to, amount) in ops {
                let _ = ledger.transfer(ACCOUNTS[from], ACCOUNTS[to], Amount::new(amount));
                prop_assert!(check_conservation_invariant(&ledger));
                prop_assert!(check_overdraft_invariant(&ledger));
            }
        }

        /// `purchase_data` rejects every underpayment, whatever the margin.
        #[test]
        fn underpayment_is_always_rejected(
            (price, paid) in (1i128..10_000).prop_flat_map(|price| (Just(price), 0..price))
        ) {
            let rt = runtime();
            rt.block_on(async move {
                let fx = create_test_market(MarketConfig::default());
                fx.clock.set(Timestamp::from_secs(1_000));

                let id = fx.market
                    .add_health_data(
                        ACCOUNTS[1],
                        "mydata",
                        DataHash::from("0x7777"),
                        Amount::new(price),
                        Timestamp::from_secs(1_000_000),
                    )
                    .await
                    .unwrap();
                // The buyer is flush; only the offer is short.
                fx.market
                    .ledger()
                    .transfer(fx.market.config().treasury, ACCOUNTS[2], Amount::new(20_000))
                    .unwrap();

                let err = fx.market
                    .purchase_data(ACCOUNTS[2], ACCOUNTS[1], id, Amount::new(paid))
                    .await
                    .unwrap_err();
                assert_eq!(err, MarketError::InsufficientFunds);
                assert_eq!(fx.market.balance_of(ACCOUNTS[2]).await, Amount::new(20_000));
            });
        }

        /// Random purchase sequences through the secure engine keep every
        /// invariant intact, successes and rejections alike.
        #[test]
        fn purchase_sequences_conserve_supply(
            ops in prop::collection::vec((1usize..4, 0usize..3, 0i128..200), 1..25)
        ) {
            let rt = runtime();
            rt.block_on(async move {
                let fx = create_test_market(MarketConfig::default());
                fx.clock.set(Timestamp::from_secs(1_000));

                let prices = [10i128, 50, 120];
                let mut records = Vec::new();
                for (i, price) in prices.iter().enumerate() {
                    let owner = ACCOUNTS[i % 2];
                    let id = fx.market
                        .add_health_data(
                            owner,
                            "record",
                            DataHash::from("hash"),
                            Amount::new(*price),
                            Timestamp::from_secs(1_000_000),
                        )
                        .await
                        .unwrap();
                    records.push((owner, id));
                }
                for buyer in &ACCOUNTS[1..] {
                    fx.market
                        .ledger()
                        .transfer(fx.market.config().treasury, *buyer, Amount::new(300))
                        .unwrap();
                }

                let ledger = fx.market.ledger();
                let store = fx.market.store();
                for (buyer, record, paid) in ops {
                    let (owner, id) = records[record];
                    let _ = fx.market
                        .purchase_data(ACCOUNTS[buyer], owner, id, Amount::new(paid))
                        .await;
                    assert!(check_all_invariants(&ledger, &store).is_valid());
                }
            });
        }
    }
}
