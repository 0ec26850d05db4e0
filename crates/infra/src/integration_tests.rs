//! End-to-end reconciliation tests against in-memory stores.
//!
//! Tests: Engine.save / delete / rededuct → CostSheetStore + InventoryStore
//!
//! Verifies:
//! - Re-saving replaces a sheet's contribution instead of adding to it
//! - Deleting hands the last persisted consumption back
//! - Partial stock write failures are resumable via rededuct
//! - Sheet persistence failures do not roll back landed stock writes

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use relo_core::{DomainError, InventoryId, JobId, Money};
    use relo_inventory::{CostSheetItem, InventoryItem, JobCostSheet, SheetStage, SheetStatus};

    use crate::reconciliation::{ReconcileError, ReconciliationEngine, StockWriteMode};
    use crate::store::{
        CostSheetStore, InMemoryCostSheetStore, InMemoryInventoryStore, InventoryStore, StoreError,
    };

    const PRICE: i64 = 250;

    /// Inventory store that fails stock writes for selected items.
    #[derive(Debug, Default)]
    struct FlakyInventoryStore {
        inner: InMemoryInventoryStore,
        failing: Mutex<HashSet<InventoryId>>,
    }

    impl FlakyInventoryStore {
        fn fail_writes(&self, id: i64) {
            self.failing.lock().unwrap().insert(InventoryId::new(id));
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }

        fn check(&self, id: InventoryId) -> Result<(), StoreError> {
            if self.failing.lock().unwrap().contains(&id) {
                return Err(StoreError::Unavailable(format!("injected failure for {id}")));
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl InventoryStore for FlakyInventoryStore {
        async fn get(&self, id: InventoryId) -> Result<Option<InventoryItem>, StoreError> {
            self.inner.get(id).await
        }

        async fn get_many(&self, ids: &[InventoryId]) -> Result<Vec<InventoryItem>, StoreError> {
            self.inner.get_many(ids).await
        }

        async fn list(&self) -> Result<Vec<InventoryItem>, StoreError> {
            self.inner.list().await
        }

        async fn set_stock(&self, id: InventoryId, stock: i64) -> Result<(), StoreError> {
            self.check(id)?;
            self.inner.set_stock(id, stock).await
        }

        async fn adjust_stock(&self, id: InventoryId, delta: i64) -> Result<i64, StoreError> {
            self.check(id)?;
            self.inner.adjust_stock(id, delta).await
        }

        async fn upsert_item(&self, item: &InventoryItem) -> Result<(), StoreError> {
            self.inner.upsert_item(item).await
        }
    }

    /// Cost sheet store whose reads or writes can be switched off.
    #[derive(Debug, Default)]
    struct FlakySheetStore {
        inner: InMemoryCostSheetStore,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl FlakySheetStore {
        fn unavailable() -> StoreError {
            StoreError::Unavailable("injected sheet store failure".to_string())
        }
    }

    #[async_trait::async_trait]
    impl CostSheetStore for FlakySheetStore {
        async fn get(&self, job_id: &JobId) -> Result<Option<JobCostSheet>, StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(Self::unavailable());
            }
            self.inner.get(job_id).await
        }

        async fn upsert(&self, sheet: &JobCostSheet) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::unavailable());
            }
            self.inner.upsert(sheet).await
        }

        async fn delete(&self, job_id: &JobId) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::unavailable());
            }
            self.inner.delete(job_id).await
        }

        async fn list(&self) -> Result<Vec<JobCostSheet>, StoreError> {
            self.inner.list().await
        }
    }

    type TestEngine = ReconciliationEngine<Arc<FlakySheetStore>, Arc<FlakyInventoryStore>>;

    struct Harness {
        engine: TestEngine,
        sheets: Arc<FlakySheetStore>,
        inventory: Arc<FlakyInventoryStore>,
    }

    fn setup_with_mode(mode: StockWriteMode) -> Harness {
        let inventory = Arc::new(FlakyInventoryStore {
            inner: InMemoryInventoryStore::with_items(
                (1..=9).map(|id| catalog_item(id, 100)),
            ),
            failing: Mutex::new(HashSet::new()),
        });
        let sheets = Arc::new(FlakySheetStore::default());
        let engine = ReconciliationEngine::new(sheets.clone(), inventory.clone())
            .with_stock_write_mode(mode);
        Harness {
            engine,
            sheets,
            inventory,
        }
    }

    fn setup() -> Harness {
        setup_with_mode(StockWriteMode::ReadModifyWrite)
    }

    fn catalog_item(id: i64, stock: i64) -> InventoryItem {
        InventoryItem::new(InventoryId::new(id), format!("MAT-{id}"), Money::from_cents(PRICE), stock)
            .with_unit("ea")
    }

    fn line(id: i64, issued: u32, returned: u32) -> CostSheetItem {
        CostSheetItem::snapshot(&catalog_item(id, 0))
            .with_issued(issued)
            .with_returned(returned)
    }

    fn job(id: &str) -> JobId {
        JobId::new(id).unwrap()
    }

    async fn stock(h: &Harness, id: i64) -> i64 {
        h.inventory
            .get(InventoryId::new(id))
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[tokio::test]
    async fn issue_return_then_delete_scenario() {
        let h = setup();
        let j1 = job("J1");

        let out = h.engine.save(&j1, vec![line(7, 10, 0)], SheetStage::Issued).await.unwrap();
        assert_eq!(out.applied, 1);
        assert_eq!(out.total_cost, Money::from_cents(10 * PRICE));
        assert_eq!(stock(&h, 7).await, 90);

        let out = h.engine.save(&j1, vec![line(7, 10, 4)], SheetStage::Returned).await.unwrap();
        assert_eq!(out.applied, 1);
        assert_eq!(out.status, SheetStatus::Returned);
        assert_eq!(out.total_cost, Money::from_cents(6 * PRICE));
        assert_eq!(stock(&h, 7).await, 94);

        let out = h.engine.delete(&j1).await.unwrap();
        assert!(out.existed);
        assert_eq!(out.reversed, 1);
        assert_eq!(stock(&h, 7).await, 100);
        assert!(h.sheets.get(&j1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn identical_resave_mutates_nothing() {
        let h = setup();
        let j = job("J2");
        let lines = vec![line(1, 5, 0), line(2, 3, 0)];

        let first = h.engine.save(&j, lines.clone(), SheetStage::Issued).await.unwrap();
        assert_eq!(first.applied, 2);

        let second = h.engine.save(&j, lines, SheetStage::Issued).await.unwrap();
        assert_eq!(second.applied, 0);
        assert!(second.is_complete());
        assert_eq!(stock(&h, 1).await, 95);
        assert_eq!(stock(&h, 2).await, 97);
    }

    #[tokio::test]
    async fn save_then_delete_restores_every_touched_item() {
        let h = setup();
        let j = job("J3");

        h.engine
            .save(&j, vec![line(1, 4, 0), line(2, 9, 0), line(3, 1, 0)], SheetStage::Issued)
            .await
            .unwrap();
        h.engine.delete(&j).await.unwrap();

        for id in 1..=3 {
            assert_eq!(stock(&h, id).await, 100);
        }
    }

    #[tokio::test]
    async fn removing_a_line_gives_its_consumption_back() {
        let h = setup();
        let j = job("J4");

        h.engine
            .save(&j, vec![line(1, 5, 0), line(2, 2, 0)], SheetStage::Issued)
            .await
            .unwrap();
        assert_eq!(stock(&h, 1).await, 95);

        let out = h.engine.save(&j, vec![line(2, 2, 0)], SheetStage::Issued).await.unwrap();
        assert_eq!(out.applied, 1);
        assert_eq!(stock(&h, 1).await, 100);
        assert_eq!(stock(&h, 2).await, 98);
    }

    #[tokio::test]
    async fn reissuing_consumes_only_the_increment() {
        let h = setup();
        let j = job("J5");

        h.engine.save(&j, vec![line(1, 5, 0)], SheetStage::Issued).await.unwrap();
        h.engine.save(&j, vec![line(1, 8, 0)], SheetStage::Issued).await.unwrap();
        assert_eq!(stock(&h, 1).await, 92);

        let out = h.engine.save(&j, vec![line(1, 8, 0)], SheetStage::Issued).await.unwrap();
        assert_eq!(out.applied, 0);
        assert_eq!(stock(&h, 1).await, 92);
    }

    #[tokio::test]
    async fn over_return_costs_nothing_but_still_moves_stock() {
        let h = setup();
        let j = job("J6");

        h.engine.save(&j, vec![line(1, 2, 0)], SheetStage::Issued).await.unwrap();
        let out = h.engine.save(&j, vec![line(1, 2, 5)], SheetStage::Returned).await.unwrap();

        assert_eq!(out.total_cost, Money::ZERO);
        // Net -3: stock ends above where it started.
        assert_eq!(stock(&h, 1).await, 103);

        h.engine.delete(&j).await.unwrap();
        assert_eq!(stock(&h, 1).await, 100);
    }

    #[tokio::test]
    async fn rejected_candidate_touches_nothing() {
        let h = setup();
        let j = job("J7");

        h.engine.save(&j, vec![line(1, 5, 0)], SheetStage::Issued).await.unwrap();

        let err = h
            .engine
            .save(&j, vec![line(1, 7, 2)], SheetStage::Returned)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));
        assert_eq!(stock(&h, 1).await, 95);

        let stored = h.sheets.get(&j).await.unwrap().unwrap();
        assert_eq!(stored.items, vec![line(1, 5, 0)]);
        assert_eq!(stored.status, SheetStatus::Issued);
    }

    #[tokio::test]
    async fn duplicate_lines_are_rejected() {
        let h = setup();
        let err = h
            .engine
            .save(&job("J8"), vec![line(1, 1, 0), line(1, 2, 0)], SheetStage::Issued)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));
        assert_eq!(stock(&h, 1).await, 100);
    }

    #[tokio::test]
    async fn partial_failure_is_resumed_by_rededuct() {
        let h = setup();
        let j = job("J9");
        let lines = vec![line(1, 5, 0), line(2, 4, 0), line(3, 3, 0)];

        h.inventory.fail_writes(2);
        let out = h.engine.save(&j, lines.clone(), SheetStage::Issued).await.unwrap();
        assert_eq!(out.applied, 2);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].inventory_id, InventoryId::new(2));
        assert_eq!(out.failures[0].diff, 4);
        assert!(!out.is_complete());
        assert_eq!(stock(&h, 1).await, 95);
        assert_eq!(stock(&h, 2).await, 100);
        assert_eq!(stock(&h, 3).await, 97);

        // The stored sheet only attributes what landed.
        let stored = h.sheets.get(&j).await.unwrap().unwrap();
        assert!(stored.item(InventoryId::new(2)).is_none());
        assert_eq!(stored.total_cost, Money::from_cents(8 * PRICE));

        h.inventory.heal();
        let out = h.engine.rededuct(&j, lines.clone(), SheetStage::Issued).await.unwrap();
        assert_eq!(out.applied, 1);
        assert!(out.is_complete());
        assert_eq!(stock(&h, 1).await, 95);
        assert_eq!(stock(&h, 2).await, 96);
        assert_eq!(stock(&h, 3).await, 97);
        assert_eq!(out.total_cost, Money::from_cents(12 * PRICE));

        // Nothing outstanding: a further rededuct is a no-op.
        let out = h.engine.rededuct(&j, lines, SheetStage::Issued).await.unwrap();
        assert_eq!(out.applied, 0);
    }

    #[tokio::test]
    async fn failed_edit_keeps_previous_line_for_that_item() {
        let h = setup();
        let j = job("J10");

        h.engine.save(&j, vec![line(1, 5, 0)], SheetStage::Issued).await.unwrap();

        h.inventory.fail_writes(1);
        let out = h.engine.save(&j, vec![line(1, 5, 2)], SheetStage::Returned).await.unwrap();
        assert_eq!(out.applied, 0);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.status, SheetStatus::Returned);

        let stored = h.sheets.get(&j).await.unwrap().unwrap();
        assert_eq!(stored.items, vec![line(1, 5, 0)]);

        h.inventory.heal();
        let out = h.engine.rededuct(&j, vec![line(1, 5, 2)], SheetStage::Returned).await.unwrap();
        assert_eq!(out.applied, 1);
        assert_eq!(stock(&h, 1).await, 97);
    }

    #[tokio::test]
    async fn unknown_catalog_item_is_reported_not_fatal() {
        let h = setup();
        let j = job("J11");

        let out = h
            .engine
            .save(&j, vec![line(1, 1, 0), line(42, 3, 0)], SheetStage::Issued)
            .await
            .unwrap();

        assert_eq!(out.applied, 1);
        assert_eq!(out.failures.len(), 1);
        assert!(matches!(out.failures[0].reason, StoreError::NotFound(_)));
        assert_eq!(stock(&h, 1).await, 99);
    }

    #[tokio::test]
    async fn sheet_persist_failure_keeps_applied_stock_writes() {
        let h = setup();
        let j = job("J12");

        h.sheets.fail_writes.store(true, Ordering::SeqCst);
        let err = h
            .engine
            .save(&j, vec![line(1, 5, 0), line(2, 1, 0)], SheetStage::Issued)
            .await
            .unwrap_err();

        match err {
            ReconcileError::SheetPersist { applied, .. } => assert_eq!(applied, 2),
            other => panic!("expected SheetPersist, got {other:?}"),
        }
        assert_eq!(stock(&h, 1).await, 95);
        assert_eq!(stock(&h, 2).await, 99);

        h.sheets.fail_writes.store(false, Ordering::SeqCst);
        assert!(h.sheets.get(&j).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sheet_read_failure_applies_nothing() {
        let h = setup();

        h.sheets.fail_reads.store(true, Ordering::SeqCst);
        let err = h
            .engine
            .save(&job("J13"), vec![line(1, 5, 0)], SheetStage::Issued)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::SheetRead(_)));
        assert_eq!(stock(&h, 1).await, 100);

        let err = h.engine.delete(&job("J13")).await.unwrap_err();
        assert!(matches!(err, ReconcileError::SheetRead(_)));
    }

    #[tokio::test]
    async fn delete_of_unknown_job_is_a_no_op() {
        let h = setup();
        let out = h.engine.delete(&job("never-saved")).await.unwrap();
        assert!(!out.existed);
        assert_eq!(out.reversed, 0);
        assert!(out.is_complete());
    }

    #[tokio::test]
    async fn partial_delete_keeps_unreversed_lines_until_retried() {
        let h = setup();
        let j = job("J14");

        h.engine
            .save(&j, vec![line(1, 5, 0), line(2, 4, 0)], SheetStage::Issued)
            .await
            .unwrap();

        h.inventory.fail_writes(2);
        let out = h.engine.delete(&j).await.unwrap();
        assert_eq!(out.reversed, 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(stock(&h, 1).await, 100);
        assert_eq!(stock(&h, 2).await, 96);

        let stored = h.sheets.get(&j).await.unwrap().unwrap();
        assert_eq!(stored.items, vec![line(2, 4, 0)]);

        h.inventory.heal();
        let out = h.engine.delete(&j).await.unwrap();
        assert_eq!(out.reversed, 1);
        assert_eq!(stock(&h, 2).await, 100);
        assert!(h.sheets.get(&j).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn finalizing_unchanged_sheet_only_updates_status() {
        let h = setup();
        let j = job("J15");

        h.engine.save(&j, vec![line(1, 10, 0)], SheetStage::Issued).await.unwrap();
        h.engine.save(&j, vec![line(1, 10, 3)], SheetStage::Returned).await.unwrap();
        let out = h.engine.save(&j, vec![line(1, 10, 3)], SheetStage::Finalized).await.unwrap();

        assert_eq!(out.applied, 0);
        assert_eq!(out.status, SheetStatus::Finalized);
        assert_eq!(stock(&h, 1).await, 93);
    }

    #[tokio::test]
    async fn finalized_sheet_cannot_be_reopened_as_issued() {
        let h = setup();
        let j = job("J19");

        h.engine.save(&j, vec![line(7, 10, 0)], SheetStage::Issued).await.unwrap();
        h.engine.save(&j, vec![line(7, 10, 4)], SheetStage::Returned).await.unwrap();
        h.engine.save(&j, vec![line(7, 10, 4)], SheetStage::Finalized).await.unwrap();
        assert_eq!(stock(&h, 7).await, 94);

        let err = h
            .engine
            .save(&j, vec![line(7, 50, 4)], SheetStage::Issued)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(DomainError::Conflict(_))));
        assert_eq!(stock(&h, 7).await, 94);

        let stored = h.sheets.get(&j).await.unwrap().unwrap();
        assert_eq!(stored.status, SheetStatus::Finalized);
        assert_eq!(stored.items, vec![line(7, 10, 4)]);
    }

    #[tokio::test]
    async fn sheets_sharing_an_item_each_keep_their_own_contribution() {
        let h = setup();
        let (a, b) = (job("JA"), job("JB"));

        h.engine.save(&a, vec![line(1, 10, 0)], SheetStage::Issued).await.unwrap();
        h.engine.save(&b, vec![line(1, 6, 0)], SheetStage::Issued).await.unwrap();
        assert_eq!(stock(&h, 1).await, 84);

        h.engine.save(&a, vec![line(1, 10, 10)], SheetStage::Returned).await.unwrap();
        assert_eq!(stock(&h, 1).await, 94);

        h.engine.delete(&b).await.unwrap();
        assert_eq!(stock(&h, 1).await, 100);
    }

    #[tokio::test]
    async fn atomic_mode_reaches_the_same_ledger_state() {
        let h = setup_with_mode(StockWriteMode::Atomic);
        let j = job("J16");

        h.engine.save(&j, vec![line(7, 10, 0)], SheetStage::Issued).await.unwrap();
        assert_eq!(stock(&h, 7).await, 90);
        h.engine.save(&j, vec![line(7, 10, 4)], SheetStage::Returned).await.unwrap();
        assert_eq!(stock(&h, 7).await, 94);

        h.inventory.fail_writes(7);
        let out = h.engine.delete(&j).await.unwrap();
        assert_eq!(out.reversed, 0);
        h.inventory.heal();

        h.engine.delete(&j).await.unwrap();
        assert_eq!(stock(&h, 7).await, 100);
    }
}
