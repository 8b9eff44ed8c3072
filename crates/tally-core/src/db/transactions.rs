//! Transaction snapshot operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::{format_timestamp, parse_timestamp, Database};
use crate::error::Result;
use crate::models::{NewTransaction, TransactionRecord};
use crate::store::TransactionStore;

impl Database {
    /// Insert a transaction for a user, returning its id
    pub fn insert_transaction(&self, user_id: i64, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO transactions (user_id, occurred_at, category_id, account_id, amount, direction)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                format_timestamp(&tx.occurred_at),
                tx.category_id,
                tx.account_id,
                tx.amount,
                tx.direction.as_str(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Transactions for a user since a point in time, oldest first
    ///
    /// Timestamps are compared as instants, so RFC 3339 rows written by
    /// other tools filter and sort correctly. Rows with a missing or
    /// unparseable timestamp are returned with `occurred_at: None` so the
    /// caller can decide how to handle them.
    pub fn list_transactions_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, occurred_at, category_id, account_id, amount, direction
            FROM transactions
            WHERE user_id = ?
              AND (datetime(occurred_at) IS NULL OR datetime(occurred_at) >= datetime(?))
            ORDER BY datetime(occurred_at) ASC, id ASC
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, format_timestamp(&since)], |row| {
            let occurred_at: Option<String> = row.get(1)?;
            Ok(TransactionRecord {
                id: row.get(0)?,
                occurred_at: occurred_at.as_deref().and_then(parse_timestamp),
                category_id: row.get(2)?,
                account_id: row.get(3)?,
                amount: row.get(4)?,
                direction: row.get(5)?,
            })
        })?;

        let records: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(records?)
    }

    /// Distinct owners of transactions
    pub fn list_user_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT user_id FROM transactions ORDER BY user_id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let ids: std::result::Result<Vec<i64>, _> = rows.collect();
        Ok(ids?)
    }
}

#[async_trait]
impl TransactionStore for Database {
    async fn transactions_for_user(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>> {
        self.run_blocking(move |db| db.list_transactions_since(user_id, since))
            .await
    }

    async fn user_ids(&self) -> Result<Vec<i64>> {
        self.run_blocking(|db| db.list_user_ids()).await
    }
}
