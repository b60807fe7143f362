//! Commission ledger queries.
//!
//! `record_award` is the only write path for new commissions. It claims the
//! triggering event in `award_events` and inserts every commission row in
//! the same transaction, so an event is awarded at most once and never
//! partially.

use rust_decimal::Decimal;

use domino_core::db::unix_timestamp;

use super::db::{Database, DatabaseError};
use super::models::{
    AwardEvent, Commission, CommissionRow, CommissionStatus, CommissionSummary, add_amount,
    decode_amount,
};

/// A commission the engine has decided to award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommission {
    pub beneficiary_user_id: String,
    pub amount: Decimal,
    pub level: u32,
}

/// Parameters for recording one triggering event's award.
pub struct AwardParams<'a> {
    pub triggering_event_id: &'a str,
    pub referred_user_id: &'a str,
    pub commissions: &'a [NewCommission],
}

/// Outcome of [`Database::record_award`].
#[derive(Debug)]
pub enum AwardWrite {
    /// This call claimed the event and wrote these rows.
    Committed(Vec<Commission>),
    /// The event was already claimed; nothing was written.
    AlreadyAwarded(AwardEvent),
}

/// Filter for listing commissions.
#[derive(Debug, Clone, Default)]
pub struct CommissionFilter {
    pub status: Option<CommissionStatus>,
    pub beneficiary_user_id: Option<String>,
    pub limit: Option<u32>,
}

impl Database {
    /// Atomically claim a triggering event and insert its commissions.
    pub async fn record_award(&self, params: &AwardParams<'_>) -> Result<AwardWrite, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        // The claim is the first statement so the write lock is taken before
        // anything is read; a concurrent claimant then sees the committed row.
        #[allow(clippy::cast_possible_wrap)]
        let claimed = sqlx::query(
            "INSERT INTO award_events (triggering_event_id, referred_user_id, commission_count, created_at) \
             VALUES (?, ?, ?, ?) ON CONFLICT(triggering_event_id) DO NOTHING",
        )
        .bind(params.triggering_event_id)
        .bind(params.referred_user_id)
        .bind(params.commissions.len() as i64)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            let existing = sqlx::query_as::<_, AwardEvent>(
                "SELECT * FROM award_events WHERE triggering_event_id = ?",
            )
            .bind(params.triggering_event_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.rollback().await?;
            return Ok(AwardWrite::AlreadyAwarded(existing));
        }

        let mut written = Vec::with_capacity(params.commissions.len());
        for new in params.commissions {
            let id = uuid::Uuid::new_v4().to_string();
            let amount = new.amount.to_string();
            sqlx::query(
                "INSERT INTO commissions (id, beneficiary_user_id, amount, level, status, triggering_event_id, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, 'pending', ?, ?, ?)",
            )
            .bind(&id)
            .bind(&new.beneficiary_user_id)
            .bind(&amount)
            .bind(i64::from(new.level))
            .bind(params.triggering_event_id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            written.push(Commission {
                id,
                beneficiary_user_id: new.beneficiary_user_id.clone(),
                amount: new.amount,
                level: new.level,
                status: CommissionStatus::Pending,
                triggering_event_id: params.triggering_event_id.to_string(),
                created_at: now,
                updated_at: now,
            });
        }

        tx.commit().await?;

        Ok(AwardWrite::Committed(written))
    }

    /// Get the award record for a triggering event, if it has been processed.
    pub async fn get_award_event(
        &self,
        triggering_event_id: &str,
    ) -> Result<Option<AwardEvent>, DatabaseError> {
        let event = sqlx::query_as::<_, AwardEvent>(
            "SELECT * FROM award_events WHERE triggering_event_id = ?",
        )
        .bind(triggering_event_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(event)
    }

    /// Commissions written for a triggering event, nearest level first.
    pub async fn list_commissions_for_event(
        &self,
        triggering_event_id: &str,
    ) -> Result<Vec<Commission>, DatabaseError> {
        sqlx::query_as::<_, CommissionRow>(
            "SELECT * FROM commissions WHERE triggering_event_id = ? ORDER BY level ASC",
        )
        .bind(triggering_event_id)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(Commission::try_from)
        .collect()
    }

    /// Get a commission by ID.
    pub async fn get_commission(&self, id: &str) -> Result<Commission, DatabaseError> {
        sqlx::query_as::<_, CommissionRow>("SELECT * FROM commissions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Commission {id}")))
            .and_then(Commission::try_from)
    }

    /// List commissions matching a filter, oldest first.
    pub async fn list_commissions(
        &self,
        filter: &CommissionFilter,
    ) -> Result<Vec<Commission>, DatabaseError> {
        let limit = filter.limit.map_or(-1, i64::from);
        sqlx::query_as::<_, CommissionRow>(
            "SELECT * FROM commissions \
             WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR beneficiary_user_id = ?2) \
             ORDER BY created_at ASC, rowid ASC LIMIT ?3",
        )
        .bind(filter.status.map(CommissionStatus::as_str))
        .bind(filter.beneficiary_user_id.as_deref())
        .bind(limit)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(Commission::try_from)
        .collect()
    }

    /// Move a pending commission to a terminal status.
    ///
    /// Returns `false` when the row exists but is no longer pending (or does
    /// not exist); the caller decides which.
    pub async fn settle_commission(
        &self,
        id: &str,
        status: CommissionStatus,
    ) -> Result<bool, DatabaseError> {
        if !status.is_terminal() {
            return Err(DatabaseError::Constraint(format!(
                "Commission {id}: {status} is not a settlement status"
            )));
        }

        let result = sqlx::query(
            "UPDATE commissions SET status = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Totals of a beneficiary's commissions by status.
    pub async fn commission_summary(
        &self,
        beneficiary_user_id: &str,
    ) -> Result<CommissionSummary, DatabaseError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT id, amount, status FROM commissions WHERE beneficiary_user_id = ?",
        )
        .bind(beneficiary_user_id)
        .fetch_all(self.pool())
        .await?;

        let mut summary = CommissionSummary {
            beneficiary_user_id: beneficiary_user_id.to_string(),
            ..CommissionSummary::default()
        };
        for (id, raw, status) in rows {
            let amount = decode_amount(&raw, "commission", &id)?;
            let status: CommissionStatus = status
                .parse()
                .map_err(|e| DatabaseError::Corrupt(format!("commission {id}: {e}")))?;
            let bucket = match status {
                CommissionStatus::Pending => &mut summary.pending,
                CommissionStatus::Paid => &mut summary.paid,
                CommissionStatus::Rejected => &mut summary.rejected,
            };
            *bucket = add_amount(*bucket, amount, "commission", &id)?;
            summary.count += 1;
        }
        Ok(summary)
    }
}
