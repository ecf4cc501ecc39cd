//! # Integration Flows
//!
//! Drives the marketplace end-to-end through the `HealthDataApi` port:
//! listing, reads, access control in both addressing modes, purchases,
//! record-bound transfers, and the vulnerable variant's known deviations.

#[cfg(test)]
mod tests {
    use hdm_market::prelude::*;
    use std::sync::Arc;

    const PATIENT: Address = Address::new([0x11; 20]);
    const USER: Address = Address::new([0x22; 20]);
    const OWNER_2: Address = Address::new([0x33; 20]);

    /// Secure market with the clock pinned to a known "now".
    fn market() -> TestMarket<HealthDataMarket> {
        let fx = create_test_market(MarketConfig::default());
        fx.clock.set(Timestamp::from_secs(1_000));
        fx
    }

    fn fund(fx: &TestMarket<HealthDataMarket>, who: Address, units: i128) {
        fx.market
            .ledger()
            .transfer(fx.market.config().treasury, who, Amount::new(units))
            .unwrap();
    }

    async fn list(
        fx: &TestMarket<HealthDataMarket>,
        owner: Address,
        name: &str,
        hash: &str,
        price: i128,
        expiration: u64,
    ) -> RecordId {
        fx.market
            .add_health_data(
                owner,
                name,
                DataHash::from(hash),
                Amount::new(price),
                Timestamp::from_secs(expiration),
            )
            .await
            .unwrap()
    }

    // =========================================================================
    // LISTING AND READS
    // =========================================================================

    #[tokio::test]
    async fn set_and_get_health_data() {
        let fx = market();
        let id = list(&fx, PATIENT, "mydata", "0x123456", 1, 4_600).await;
        assert_eq!(id, RecordId::new(1));

        let records = fx.market.get_all_my_health_records(PATIENT).await;
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.id, RecordId::new(1));
        assert_eq!(record.name, "mydata");
        assert_eq!(record.data_hash, DataHash::from("0x123456"));
        assert_eq!(record.price, Amount::new(1));
        assert!(record.is_for_sale);
        assert_eq!(record.owner, PATIENT);
        assert_eq!(record.expiration, Timestamp::from_secs(4_600));
        assert!(record.access_list.is_empty());
    }

    #[tokio::test]
    async fn caller_records_are_listed_in_creation_order() {
        let fx = market();
        list(&fx, PATIENT, "Health Record 1", "hash123", 10, 4_600).await;
        list(&fx, OWNER_2, "other owner", "hashXYZ", 5, 4_600).await;
        list(&fx, PATIENT, "Health Record 2", "hash456", 20, 8_200).await;

        let records = fx.market.get_all_my_health_records(PATIENT).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, RecordId::new(1));
        assert_eq!(records[0].name, "Health Record 1");
        assert_eq!(records[1].id, RecordId::new(3));
        assert_eq!(records[1].name, "Health Record 2");
    }

    #[tokio::test]
    async fn positional_lookup_fails_past_the_end() {
        let fx = market();
        list(&fx, PATIENT, "only", "hash123", 10, 4_600).await;

        assert!(fx.market.get_record(PATIENT, 0).await.is_ok());
        let err = fx.market.get_record(PATIENT, 1).await.unwrap_err();
        assert!(matches!(err, MarketError::RecordIndexOutOfRange { .. }));
    }

    // =========================================================================
    // ACCESS CONTROL
    // =========================================================================

    #[tokio::test]
    async fn owner_grants_access_and_sharing_reflects_it() {
        let fx = market();
        let id = list(&fx, PATIENT, "Health Record 1", "hash123", 10, 4_600).await;

        fx.market
            .grant_access(PATIENT, RecordRef::Id(id), USER)
            .await
            .unwrap();

        let shared = fx.market.get_all_records_shared_with_me(USER).await;
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, id);
        assert_eq!(shared[0].owner, PATIENT);
        assert!(shared[0].access_list.contains(&USER));

        assert_eq!(fx.market.get_access_list(PATIENT).await, vec![USER]);
    }

    #[tokio::test]
    async fn unauthorized_grant_is_rejected() {
        let fx = market();
        let id = list(&fx, PATIENT, "Health Record 1", "hash123", 10, 4_600).await;

        let err = fx
            .market
            .grant_access(USER, RecordRef::Id(id), OWNER_2)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized access");
        assert!(fx.market.get_access_list(PATIENT).await.is_empty());
    }

    #[tokio::test]
    async fn grant_and_revoke_are_idempotent() {
        let fx = market();
        let id = list(&fx, PATIENT, "mydata", "hash123", 10, 4_600).await;

        fx.market
            .grant_access(PATIENT, RecordRef::Id(id), USER)
            .await
            .unwrap();
        fx.market
            .grant_access(PATIENT, RecordRef::Id(id), USER)
            .await
            .unwrap();
        assert_eq!(fx.market.get_access_list(PATIENT).await, vec![USER]);
        assert_eq!(fx.events.with_topic(topics::ACCESS_GRANTED).len(), 1);

        fx.market
            .revoke_access(PATIENT, RecordRef::Id(id), USER)
            .await
            .unwrap();
        // Revoking an absent grantee is a silent no-op.
        fx.market
            .revoke_access(PATIENT, RecordRef::Id(id), USER)
            .await
            .unwrap();
        assert!(fx.market.get_access_list(PATIENT).await.is_empty());
        assert_eq!(fx.events.with_topic(topics::ACCESS_REVOKED).len(), 1);
    }

    #[tokio::test]
    async fn legacy_owner_addressing_works_for_a_single_record() {
        let fx = market();
        list(&fx, PATIENT, "only", "hash123", 10, 4_600).await;

        fx.market
            .grant_access(PATIENT, RecordRef::Owner(PATIENT), USER)
            .await
            .unwrap();
        assert_eq!(fx.market.get_access_list(PATIENT).await, vec![USER]);

        // A second record makes the owner-addressed form ambiguous.
        list(&fx, PATIENT, "second", "hash456", 20, 4_600).await;
        let err = fx
            .market
            .grant_access(PATIENT, RecordRef::Owner(PATIENT), OWNER_2)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::OwnerRefAmbiguous { count: 2, .. }));
    }

    #[tokio::test]
    async fn patient_view_is_scoped_to_authorization() {
        let fx = market();
        let visible = list(&fx, PATIENT, "shared", "hash123", 10, 4_600).await;
        list(&fx, PATIENT, "private", "hash456", 20, 4_600).await;

        fx.market
            .grant_access(PATIENT, RecordRef::Id(visible), USER)
            .await
            .unwrap();

        let seen = fx
            .market
            .get_health_data_of_patient(USER, PATIENT)
            .await
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, visible);

        let err = fx
            .market
            .get_health_data_of_patient(OWNER_2, PATIENT)
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::Unauthorized);
    }

    // =========================================================================
    // PURCHASES
    // =========================================================================

    #[tokio::test]
    async fn purchase_moves_price_from_buyer_to_owner() {
        let fx = market();
        let id = list(&fx, PATIENT, "mydata", "0x123456", 1, 4_600).await;
        fund(&fx, USER, 100);

        let owner_before = fx.market.balance_of(PATIENT).await;
        let buyer_before = fx.market.balance_of(USER).await;

        fx.market
            .purchase_data(USER, PATIENT, id, Amount::new(1))
            .await
            .unwrap();

        assert_eq!(
            fx.market.balance_of(PATIENT).await,
            owner_before.saturating_add(Amount::new(1))
        );
        assert_eq!(
            fx.market.balance_of(USER).await,
            buyer_before.saturating_sub(Amount::new(1))
        );

        let purchases = fx.events.with_topic(topics::DATA_PURCHASED);
        assert_eq!(purchases.len(), 1);
        assert_eq!(
            purchases[0],
            MarketEvent::DataPurchased {
                purchaser: USER,
                owner: PATIENT,
                record_id: id,
                price: Amount::new(1),
            }
        );
    }

    #[tokio::test]
    async fn underpaying_reverts_with_the_fixed_message() {
        let fx = market();
        let id = list(&fx, PATIENT, "mydata", "0x123456", 100, 4_600).await;
        fund(&fx, USER, 1_000);

        let err = fx
            .market
            .purchase_data(USER, PATIENT, id, Amount::new(50))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Insufficient funds to purchase data");
    }

    #[tokio::test]
    async fn expired_data_reverts_with_the_fixed_message() {
        let fx = market();
        // Expires 20 seconds from "now".
        let id = list(&fx, PATIENT, "mydata", "hash456", 100, 1_020).await;
        fund(&fx, USER, 1_000);

        fx.clock.advance(21);
        let err = fx
            .market
            .purchase_data(USER, PATIENT, id, Amount::new(100))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Data has expired");
    }

    #[tokio::test]
    async fn worked_example_from_the_contract_surface() {
        // Record ("mydata", "0x7777", 1 unit, now + 3600).
        let fx = market();
        let id = list(&fx, PATIENT, "mydata", "0x7777", 1, 4_600).await;
        fund(&fx, USER, 1);

        // Paying exactly the price succeeds and emits DataPurchased.
        fx.market
            .purchase_data(USER, PATIENT, id, Amount::new(1))
            .await
            .unwrap();
        assert_eq!(fx.events.with_topic(topics::DATA_PURCHASED).len(), 1);

        // A zero-balance buyer purchasing the same record again fails.
        let err = fx
            .market
            .purchase_data(OWNER_2, PATIENT, id, Amount::new(1))
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::InsufficientFunds);
        assert_eq!(fx.events.with_topic(topics::DATA_PURCHASED).len(), 1);
    }

    #[tokio::test]
    async fn purchase_delivers_the_fingerprint_to_the_buyer() {
        let fx = market();
        let id = list(&fx, PATIENT, "mydata", "0x7777", 1, 4_600).await;
        fund(&fx, USER, 1);

        fx.market
            .purchase_data(USER, PATIENT, id, Amount::new(1))
            .await
            .unwrap();

        let deliveries = fx.delivery.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].purchaser, USER);
        assert_eq!(deliveries[0].data_hash, DataHash::from("0x7777"));
    }

    // =========================================================================
    // RECORD-BOUND TRANSFERS
    // =========================================================================

    #[tokio::test]
    async fn transfer_with_access_requires_grant_and_exact_amount() {
        let fx = market();
        let id = list(&fx, PATIENT, "mydata", "hash123", 50, 4_600).await;
        fund(&fx, USER, 200);

        let err = fx
            .market
            .transfer_with_access(USER, PATIENT, Amount::new(50))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized access");

        fx.market
            .grant_access(PATIENT, RecordRef::Id(id), USER)
            .await
            .unwrap();

        let err = fx
            .market
            .transfer_with_access(USER, PATIENT, Amount::new(51))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Incorrect amount for data access");

        fx.market
            .transfer_with_access(USER, PATIENT, Amount::new(50))
            .await
            .unwrap();
        assert_eq!(fx.market.balance_of(USER).await, Amount::new(150));
        assert_eq!(fx.market.balance_of(PATIENT).await, Amount::new(50));
    }

    #[tokio::test]
    async fn purchases_commit_whatever_the_gateway_does() {
        use std::sync::atomic::{AtomicU64, Ordering};

        // A hand-rolled gateway: deliveries are a notification hook, so the
        // purchase must be fully settled whether or not anyone listens.
        struct CountingDelivery(AtomicU64);

        #[async_trait::async_trait]
        impl DeliveryGateway for CountingDelivery {
            async fn deliver(&self, _delivery: DataDelivery) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let clock = Arc::new(ManualClock::at(Timestamp::from_secs(1_000)));
        let events = Arc::new(InMemoryEventLog::new());
        let counter = Arc::new(CountingDelivery(AtomicU64::new(0)));
        let market = HealthDataMarket::new(
            MarketConfig::default(),
            clock,
            counter.clone(),
            events,
        )
        .unwrap();

        let id = market
            .add_health_data(
                PATIENT,
                "mydata",
                DataHash::from("0x7777"),
                Amount::new(1),
                Timestamp::from_secs(4_600),
            )
            .await
            .unwrap();
        market
            .ledger()
            .transfer(market.config().treasury, USER, Amount::new(1))
            .unwrap();

        market
            .purchase_data(USER, PATIENT, id, Amount::new(1))
            .await
            .unwrap();

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(market.balance_of(PATIENT).await, Amount::new(1));
    }

    // =========================================================================
    // VULNERABLE VARIANT DEVIATIONS
    // =========================================================================

    #[tokio::test]
    async fn vulnerable_variant_lets_unauthorized_grants_through() {
        let fx = create_test_vulnerable_market(MarketConfig::default());
        fx.clock.set(Timestamp::from_secs(1_000));
        let id = fx
            .market
            .add_health_data(
                PATIENT,
                "Health Record 1",
                DataHash::from("hash123"),
                Amount::new(10),
                Timestamp::from_secs(4_600),
            )
            .await
            .unwrap();

        // USER is not the owner; on this variant the grant lands anyway.
        fx.market
            .grant_access(USER, RecordRef::Id(id), OWNER_2)
            .await
            .unwrap();
        assert_eq!(fx.market.get_access_list(PATIENT).await, vec![OWNER_2]);
    }

    // =========================================================================
    // INVARIANTS ACROSS A MIXED FLOW
    // =========================================================================

    #[tokio::test]
    async fn mixed_flow_preserves_all_invariants() {
        let fx = market();
        let first = list(&fx, PATIENT, "a", "h1", 10, 4_600).await;
        let second = list(&fx, OWNER_2, "b", "h2", 25, 4_600).await;
        fund(&fx, USER, 500);

        fx.market
            .grant_access(PATIENT, RecordRef::Id(first), USER)
            .await
            .unwrap();
        fx.market
            .purchase_data(USER, PATIENT, first, Amount::new(10))
            .await
            .unwrap();
        fx.market
            .purchase_data(USER, OWNER_2, second, Amount::new(30))
            .await
            .unwrap();
        fx.market
            .transfer_with_access(USER, PATIENT, Amount::new(10))
            .await
            .unwrap();

        let ledger = fx.market.ledger();
        let store = fx.market.store();
        assert!(check_all_invariants(&ledger, &store).is_valid());

        // Conservation spelled out: the books still sum to the mint.
        let total = ledger
            .snapshot()
            .iter()
            .fold(Amount::ZERO, |acc, (_, balance)| acc.saturating_add(*balance));
        assert_eq!(total, fx.market.config().initial_supply);
    }
}
