#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! End-to-end tests for the commission engine against a real `SQLite` ledger.
//!
//! Covers the full flow: registration → deposit approval → chain resolution
//! → qualification → exactly-once award → payout settlement.

use std::sync::Arc;

use rust_decimal::Decimal;

use domino_core::CommissionSchedule;
use domino_engine::commission::{CommissionEngine, CommissionError, PayoutLedger, SettlementError};
use domino_engine::storage::{Commission, CommissionStatus, Database, DepositStatus};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

async fn engine_with_db() -> CommissionEngine<Database> {
    let db = Database::open_in_memory().await.unwrap();
    CommissionEngine::new(db, CommissionSchedule::default())
}

/// Registers `ids` as a single line, each referred by the one before it.
async fn register_line(db: &Database, ids: &[&str]) {
    let mut referrer = None;
    for id in ids {
        db.create_user(id, referrer).await.unwrap();
        referrer = Some(*id);
    }
}

async fn approved_deposit(db: &Database, id: &str, user: &str, amount: &str) {
    db.create_deposit(id, user, dec(amount)).await.unwrap();
    db.set_deposit_status(id, DepositStatus::Approved)
        .await
        .unwrap();
}

/// A <- B <- C <- D, everyone except D funded with `funding[i]`.
async fn seeded_line(db: &Database, funding: [&str; 3]) {
    register_line(db, &["A", "B", "C", "D"]).await;
    for (user, amount) in ["A", "B", "C"].into_iter().zip(funding) {
        approved_deposit(db, &format!("seed-{user}"), user, amount).await;
    }
}

fn by_level(rows: &[Commission]) -> Vec<(u32, &str, Decimal)> {
    let mut out: Vec<_> = rows
        .iter()
        .map(|c| (c.level, c.beneficiary_user_id.as_str(), c.amount))
        .collect();
    out.sort_by_key(|(level, _, _)| *level);
    out
}

#[tokio::test]
async fn deposit_approval_pays_the_whole_chain() {
    let engine = engine_with_db().await;
    let db = engine.store();
    seeded_line(db, ["10", "10", "10"]).await;
    approved_deposit(db, "dep-d", "D", "10").await;

    let rows = engine.on_deposit_approved("D", "dep-d").await.unwrap();

    assert_eq!(
        by_level(&rows),
        vec![
            (1, "C", dec("0.50")),
            (2, "B", dec("0.25")),
            (3, "A", dec("0.17")),
        ]
    );
    assert!(rows.iter().all(|c| c.status == CommissionStatus::Pending));
    assert!(rows.iter().all(|c| c.triggering_event_id == "dep-d"));
}

#[tokio::test]
async fn ancestor_below_threshold_is_skipped() {
    let engine = engine_with_db().await;
    let db = engine.store();
    seeded_line(db, ["10", "5", "10"]).await;
    approved_deposit(db, "dep-d", "D", "10").await;

    let rows = engine.on_deposit_approved("D", "dep-d").await.unwrap();

    // B's level is consumed even though B earns nothing.
    assert_eq!(
        by_level(&rows),
        vec![(1, "C", dec("0.50")), (3, "A", dec("0.17"))]
    );
}

#[tokio::test]
async fn trigger_below_threshold_awards_nothing() {
    let engine = engine_with_db().await;
    let db = engine.store();
    seeded_line(db, ["10", "10", "10"]).await;
    approved_deposit(db, "dep-d", "D", "9.99").await;

    let rows = engine.on_deposit_approved("D", "dep-d").await.unwrap();
    assert!(rows.is_empty());

    // A second deposit pushes D over the threshold and triggers a fresh award.
    approved_deposit(db, "dep-d2", "D", "0.01").await;
    let rows = engine.on_deposit_approved("D", "dep-d2").await.unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn repeated_trigger_is_idempotent() {
    let engine = engine_with_db().await;
    let db = engine.store();
    seeded_line(db, ["10", "10", "10"]).await;
    approved_deposit(db, "dep-d", "D", "10").await;

    let first = engine.on_deposit_approved("D", "dep-d").await.unwrap();
    let second = engine.on_deposit_approved("D", "dep-d").await.unwrap();

    let mut first_ids: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
    let mut second_ids: Vec<_> = second.iter().map(|c| c.id.clone()).collect();
    first_ids.sort();
    second_ids.sort();
    assert_eq!(first_ids, second_ids);

    let ledger = PayoutLedger::new(db.clone());
    assert_eq!(ledger.pending(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn concurrent_triggers_award_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("ledger.db")).await.unwrap();
    seeded_line(&db, ["10", "10", "10"]).await;
    approved_deposit(&db, "dep-d", "D", "10").await;

    let engine = Arc::new(CommissionEngine::new(db.clone(), CommissionSchedule::default()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.on_deposit_approved("D", "dep-d").await })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    let mut expected: Vec<_> = results[0].iter().map(|c| c.id.clone()).collect();
    expected.sort();
    for rows in &results {
        let mut ids: Vec<_> = rows.iter().map(|c| c.id.clone()).collect();
        ids.sort();
        assert_eq!(ids, expected);
    }

    let stored = db.list_commissions_for_event("dep-d").await.unwrap();
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn invalid_triggers_are_rejected() {
    let engine = engine_with_db().await;
    let db = engine.store();
    seeded_line(db, ["10", "10", "10"]).await;
    db.create_deposit("dep-pending", "D", dec("10")).await.unwrap();

    let unknown_deposit = engine.on_deposit_approved("D", "nope").await.unwrap_err();
    assert!(matches!(unknown_deposit, CommissionError::InvalidTrigger(_)));

    let pending = engine
        .on_deposit_approved("D", "dep-pending")
        .await
        .unwrap_err();
    assert!(matches!(pending, CommissionError::InvalidTrigger(_)));

    let wrong_owner = engine
        .on_deposit_approved("C", "seed-A")
        .await
        .unwrap_err();
    assert!(matches!(wrong_owner, CommissionError::InvalidTrigger(_)));

    let unknown_user = engine.award("evt-1", "ghost").await.unwrap_err();
    assert!(matches!(unknown_user, CommissionError::InvalidTrigger(_)));
    assert!(!unknown_user.is_retryable());

    let empty_event = engine.award("  ", "D").await.unwrap_err();
    assert!(matches!(empty_event, CommissionError::InvalidTrigger(_)));
}

#[tokio::test]
async fn replay_for_a_different_user_is_rejected() {
    let engine = engine_with_db().await;
    let db = engine.store();
    seeded_line(db, ["10", "10", "10"]).await;
    approved_deposit(db, "dep-d", "D", "10").await;

    engine.award("evt-1", "D").await.unwrap();
    let err = engine.award("evt-1", "C").await.unwrap_err();
    assert!(matches!(err, CommissionError::InvalidTrigger(_)));
}

#[tokio::test]
async fn every_level_of_a_deep_chain_is_paid() {
    let engine = engine_with_db().await;
    let db = engine.store();
    let ids = ["u0", "u1", "u2", "u3", "u4", "u5", "u6"];
    register_line(db, &ids).await;
    for id in ids {
        approved_deposit(db, &format!("seed-{id}"), id, "20").await;
    }

    let rows = engine.award("evt-deep", "u6").await.unwrap();
    let levels = by_level(&rows);

    assert_eq!(levels.len(), 6);
    for (i, (level, beneficiary, amount)) in levels.iter().enumerate() {
        let expected_level = u32::try_from(i).unwrap() + 1;
        assert_eq!(*level, expected_level);
        assert_eq!(*beneficiary, ids[5 - i]);
        assert_eq!(*amount, engine.schedule().amount_for_level(expected_level));
    }
    assert_eq!(levels[5].2, dec("0.08"));
}

#[tokio::test]
async fn chain_is_cut_at_max_depth() {
    let db = Database::open_in_memory().await.unwrap();
    let schedule = CommissionSchedule {
        max_chain_depth: 2,
        ..CommissionSchedule::default()
    };
    let engine = CommissionEngine::new(db, schedule);
    let db = engine.store();
    seeded_line(db, ["10", "10", "10"]).await;
    approved_deposit(db, "dep-d", "D", "10").await;

    let rows = engine.on_deposit_approved("D", "dep-d").await.unwrap();
    assert_eq!(
        by_level(&rows),
        vec![(1, "C", dec("0.50")), (2, "B", dec("0.25"))]
    );
}

#[tokio::test]
async fn strict_mode_excludes_unreferred_ancestors() {
    let db = Database::open_in_memory().await.unwrap();
    let schedule = CommissionSchedule {
        require_referred_beneficiary: true,
        ..CommissionSchedule::default()
    };
    let engine = CommissionEngine::new(db, schedule);
    let db = engine.store();
    seeded_line(db, ["10", "10", "10"]).await;
    approved_deposit(db, "dep-d", "D", "10").await;

    let rows = engine.on_deposit_approved("D", "dep-d").await.unwrap();
    assert_eq!(
        by_level(&rows),
        vec![(1, "C", dec("0.50")), (2, "B", dec("0.25"))]
    );
}

#[tokio::test]
async fn plan_does_not_write() {
    let engine = engine_with_db().await;
    let db = engine.store();
    seeded_line(db, ["10", "5", "10"]).await;
    approved_deposit(db, "dep-d", "D", "10").await;

    let plan = engine.plan("D").await.unwrap();
    assert!(plan.trigger.qualifies);
    assert_eq!(plan.levels.len(), 3);
    assert_eq!(plan.levels[1].amount, None);
    assert_eq!(plan.commissions().len(), 2);

    assert!(db.get_award_event("dep-d").await.unwrap().is_none());
}

#[tokio::test]
async fn payout_settlement_flow() {
    let engine = engine_with_db().await;
    let db = engine.store();
    seeded_line(db, ["10", "10", "10"]).await;
    approved_deposit(db, "dep-d", "D", "10").await;
    let rows = engine.on_deposit_approved("D", "dep-d").await.unwrap();
    let ledger = PayoutLedger::new(db.clone());

    let target = &rows[0];
    let paid = ledger.settle(&target.id, CommissionStatus::Paid).await.unwrap();
    assert_eq!(paid.status, CommissionStatus::Paid);
    assert_eq!(paid.amount, target.amount);

    let again = ledger
        .settle(&target.id, CommissionStatus::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(again, SettlementError::AlreadySettled { .. }));

    let missing = ledger.settle("nope", CommissionStatus::Paid).await.unwrap_err();
    assert!(matches!(missing, SettlementError::NotFound(_)));

    let invalid = ledger
        .settle(&rows[1].id, CommissionStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(invalid, SettlementError::InvalidTarget(_)));

    assert_eq!(ledger.pending(None).await.unwrap().len(), 2);
    let summary = ledger.summary(&target.beneficiary_user_id).await.unwrap();
    assert_eq!(summary.paid, target.amount);

    // Settlement does not reopen the award.
    let replayed = engine.on_deposit_approved("D", "dep-d").await.unwrap();
    assert_eq!(replayed.len(), 3);
}

#[tokio::test]
async fn overflowing_deposits_surface_as_integrity_error() {
    let engine = engine_with_db().await;
    let db = engine.store();
    register_line(db, &["A", "B"]).await;
    for id in ["x1", "x2"] {
        db.create_deposit(id, "B", Decimal::MAX).await.unwrap();
        db.set_deposit_status(id, DepositStatus::Approved)
            .await
            .unwrap();
    }

    let err = engine.on_deposit_approved("B", "x2").await.unwrap_err();
    assert!(matches!(err, CommissionError::DataIntegrity(_)));
    assert!(db.get_award_event("x2").await.unwrap().is_none());
}

#[tokio::test]
async fn stored_amounts_keep_two_decimal_places() {
    let engine = engine_with_db().await;
    let db = engine.store();
    seeded_line(db, ["10", "10", "10"]).await;
    approved_deposit(db, "dep-d", "D", "10").await;
    engine.on_deposit_approved("D", "dep-d").await.unwrap();

    let stored = db.list_commissions_for_event("dep-d").await.unwrap();
    let rendered: Vec<_> = stored.iter().map(|c| c.amount.to_string()).collect();
    assert_eq!(rendered, vec!["0.50", "0.25", "0.17"]);
}
