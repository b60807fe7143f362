//! Referral graph and deposit ledger queries.

use rust_decimal::Decimal;

use domino_core::db::unix_timestamp;

use super::db::{Database, DatabaseError};
use super::models::{
    Deposit, DepositRow, DepositStatus, ReferralEdge, User, add_amount, decode_amount,
};
use crate::forest::ReferralForest;

impl Database {
    // =========================================================================
    // User / referral graph queries
    // =========================================================================

    /// Register a user, recording the referral edge when a referrer is given.
    ///
    /// The user row and its edge are written in one transaction. The
    /// referrer must already exist, which keeps the relation acyclic.
    pub async fn create_user(
        &self,
        id: &str,
        referrer_id: Option<&str>,
    ) -> Result<User, DatabaseError> {
        if referrer_id == Some(id) {
            return Err(DatabaseError::Constraint(format!(
                "User {id} cannot refer themselves"
            )));
        }

        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        if let Some(referrer) = referrer_id {
            let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
                .bind(referrer)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(DatabaseError::NotFound(format!("Referrer {referrer}")));
            }
        }

        sqlx::query("INSERT INTO users (id, referrer_id, created_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(referrer_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        if let Some(referrer) = referrer_id {
            sqlx::query(
                "INSERT INTO referral_edges (referrer_id, referred_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(referrer)
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_user(id).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Whether a user with this ID is registered.
    pub async fn user_exists(&self, id: &str) -> Result<bool, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Direct referrer of a user, if any.
    pub async fn get_referrer_of(&self, user_id: &str) -> Result<Option<String>, DatabaseError> {
        let referrer = sqlx::query_scalar::<_, String>(
            "SELECT referrer_id FROM referral_edges WHERE referred_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(referrer)
    }

    /// Users directly invited by `referrer_id`, oldest first.
    pub async fn list_referrals(&self, referrer_id: &str) -> Result<Vec<ReferralEdge>, DatabaseError> {
        let edges = sqlx::query_as::<_, ReferralEdge>(
            "SELECT * FROM referral_edges WHERE referrer_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(referrer_id)
        .fetch_all(self.pool())
        .await?;
        Ok(edges)
    }

    /// Build an in-memory snapshot of the whole referral forest.
    ///
    /// Users are loaded in registration order, so every referrer is
    /// inserted before the users it invited.
    pub async fn load_forest(&self) -> Result<ReferralForest, DatabaseError> {
        let users =
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC, rowid ASC")
                .fetch_all(self.pool())
                .await?;

        let mut forest = ReferralForest::with_capacity(users.len());
        for user in users {
            forest
                .insert(&user.id, user.referrer_id.as_deref())
                .map_err(|e| DatabaseError::Corrupt(e.to_string()))?;
        }
        Ok(forest)
    }

    // =========================================================================
    // Deposit ledger queries
    // =========================================================================

    /// Record a new pending deposit.
    pub async fn create_deposit(
        &self,
        id: &str,
        user_id: &str,
        amount: Decimal,
    ) -> Result<Deposit, DatabaseError> {
        if amount <= Decimal::ZERO {
            return Err(DatabaseError::Constraint(format!(
                "Deposit {id}: amount must be positive, got {amount}"
            )));
        }
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO deposits (id, user_id, amount, status, created_at, updated_at) VALUES (?, ?, ?, 'pending', ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(amount.normalize().to_string())
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_deposit(id).await
    }

    /// Get a deposit by ID.
    pub async fn get_deposit(&self, id: &str) -> Result<Deposit, DatabaseError> {
        self.find_deposit(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Deposit {id}")))
    }

    /// Get a deposit by ID, `None` if it does not exist.
    pub async fn find_deposit(&self, id: &str) -> Result<Option<Deposit>, DatabaseError> {
        sqlx::query_as::<_, DepositRow>("SELECT * FROM deposits WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Deposit::try_from)
            .transpose()
    }

    /// List a user's deposits, oldest first.
    pub async fn list_deposits(&self, user_id: &str) -> Result<Vec<Deposit>, DatabaseError> {
        sqlx::query_as::<_, DepositRow>(
            "SELECT * FROM deposits WHERE user_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(Deposit::try_from)
        .collect()
    }

    /// Move a pending deposit to `approved` or `failed`.
    ///
    /// Only a pending deposit may change status; anything else is a
    /// `Conflict`.
    pub async fn set_deposit_status(
        &self,
        id: &str,
        status: DepositStatus,
    ) -> Result<Deposit, DatabaseError> {
        if status == DepositStatus::Pending {
            return Err(DatabaseError::Constraint(format!(
                "Deposit {id}: cannot move back to pending"
            )));
        }

        let now = unix_timestamp();
        let result = sqlx::query(
            "UPDATE deposits SET status = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_deposit(id).await?;
            return Err(DatabaseError::Conflict(format!(
                "Deposit {id} is already {}",
                current.status
            )));
        }

        self.get_deposit(id).await
    }

    /// Sum of a user's approved deposit amounts (zero if none).
    ///
    /// A total beyond `Decimal`'s range is reported as `Corrupt`.
    pub async fn sum_approved_deposits(&self, user_id: &str) -> Result<Decimal, DatabaseError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, amount FROM deposits WHERE user_id = ? AND status = 'approved'",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter().try_fold(Decimal::ZERO, |total, (id, raw)| {
            add_amount(total, decode_amount(raw, "deposit", id)?, "deposit", id)
        })
    }
}
