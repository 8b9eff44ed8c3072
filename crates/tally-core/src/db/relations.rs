//! Relation graph persistence

use async_trait::async_trait;
use rusqlite::params;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{RelationRecord, RelationType};
use crate::store::RelationStore;

impl Database {
    /// Delete every relation owned by a user
    pub fn delete_relations_for_user(&self, user_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM entity_relations WHERE user_id = ?",
            params![user_id],
        )?;
        Ok(deleted)
    }

    /// Insert a batch of relations inside one SQL transaction
    ///
    /// Either the whole batch is committed or none of it is, so a failed
    /// batch can be retried as-is.
    pub fn insert_relations(&self, records: &[RelationRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entity_relations (
                    user_id, entity_type, entity_id, related_type, related_id,
                    relation_type, strength, metadata
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for r in records {
                let metadata = r
                    .metadata
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![
                    r.owner_user_id,
                    r.entity_type.as_str(),
                    r.entity_id,
                    r.related_type.as_str(),
                    r.related_id,
                    r.relation_type.as_str(),
                    r.strength,
                    metadata,
                ])?;
            }
        }

        tx.commit()?;
        Ok(records.len())
    }

    /// All relations owned by a user, in insertion order
    pub fn list_relations_for_user(&self, user_id: i64) -> Result<Vec<RelationRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT user_id, entity_type, entity_id, related_type, related_id,
                   relation_type, strength, metadata
            FROM entity_relations
            WHERE user_id = ?
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (owner, et, eid, rt, rid, kind, strength, metadata) = row?;
            records.push(RelationRecord {
                owner_user_id: owner,
                entity_type: et.parse().map_err(Error::InvalidData)?,
                entity_id: eid,
                related_type: rt.parse().map_err(Error::InvalidData)?,
                related_id: rid,
                relation_type: kind.parse().map_err(Error::InvalidData)?,
                strength,
                metadata: metadata
                    .as_deref()
                    .map(serde_json::from_str::<serde_json::Value>)
                    .transpose()?,
            });
        }

        Ok(records)
    }

    /// Relation count for a user, optionally restricted to one type
    pub fn count_relations(&self, user_id: i64, kind: Option<RelationType>) -> Result<i64> {
        let conn = self.conn()?;
        let count = match kind {
            Some(kind) => conn.query_row(
                "SELECT COUNT(*) FROM entity_relations WHERE user_id = ? AND relation_type = ?",
                params![user_id, kind.as_str()],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM entity_relations WHERE user_id = ?",
                params![user_id],
                |row| row.get(0),
            )?,
        };
        Ok(count)
    }
}

#[async_trait]
impl RelationStore for Database {
    async fn delete_all_for_user(&self, user_id: i64) -> Result<usize> {
        self.run_blocking_write(move |db| db.delete_relations_for_user(user_id))
            .await
    }

    async fn insert_batch(&self, records: &[RelationRecord]) -> Result<usize> {
        let records = records.to_vec();
        self.run_blocking_write(move |db| db.insert_relations(&records))
            .await
    }

    async fn relations_for_user(&self, user_id: i64) -> Result<Vec<RelationRecord>> {
        self.run_blocking(move |db| db.list_relations_for_user(user_id))
            .await
    }
}
