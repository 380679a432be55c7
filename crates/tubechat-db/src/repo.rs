use std::marker::PhantomData;

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use uuid::Uuid;

use crate::Database;
use crate::models::{Entity, uuid_value};

/// CRUD over a single entity table. Entity-specific lookups are added as
/// inherent impls on `Repo<'_, ConcreteEntity>` (see `queries`).
pub struct Repo<'a, E> {
    db: &'a Database,
    _entity: PhantomData<E>,
}

impl<'a, E: Entity> Repo<'a, E> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    pub fn create(&self, entity: E) -> Result<E> {
        let placeholders: Vec<String> = (1..=E::COLUMNS.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            E::TABLE,
            E::COLUMNS.join(", "),
            placeholders.join(", ")
        );

        self.db.with_conn(|conn| {
            conn.execute(&sql, params_from_iter(entity.values()))?;
            Ok(())
        })?;
        Ok(entity)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<E>> {
        self.find_one(&format!("{} = ?1", E::COLUMNS[0]), vec![uuid_value(id)])
    }

    /// Page through all rows in insertion order.
    pub fn get_all(&self, skip: u32, limit: u32) -> Result<Vec<E>> {
        self.find_many(
            "1 = 1",
            "rowid ASC LIMIT ?1 OFFSET ?2",
            vec![Value::Integer(limit.into()), Value::Integer(skip.into())],
        )
    }

    /// Overwrite every non-key column. Returns false when no row matched.
    pub fn update(&self, entity: &E) -> Result<bool> {
        let assignments: Vec<String> = E::COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, col)| format!("{} = ?{}", col, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?1",
            E::TABLE,
            assignments.join(", "),
            E::COLUMNS[0]
        );

        let changed = self
            .db
            .with_conn(|conn| Ok(conn.execute(&sql, params_from_iter(entity.values()))?))?;
        Ok(changed > 0)
    }

    /// Returns false when no row matched.
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE {} = ?1", E::TABLE, E::COLUMNS[0]);
        let changed = self
            .db
            .with_conn(|conn| Ok(conn.execute(&sql, [id.to_string()])?))?;
        Ok(changed > 0)
    }

    pub(crate) fn find_one(&self, filter: &str, params: Vec<Value>) -> Result<Option<E>> {
        let mut rows = self.query(&format!("{} WHERE {} LIMIT 1", select_sql::<E>(), filter), params)?;
        Ok(rows.pop())
    }

    pub(crate) fn find_many(&self, filter: &str, order: &str, params: Vec<Value>) -> Result<Vec<E>> {
        self.query(
            &format!("{} WHERE {} ORDER BY {}", select_sql::<E>(), filter, order),
            params,
        )
    }

    pub(crate) fn scalar(&self, sql: &str, params: Vec<Value>) -> Result<i64> {
        self.db
            .with_conn(|conn| Ok(conn.query_row(sql, params_from_iter(params), |r| r.get(0))?))
    }

    fn query(&self, sql: &str, params: Vec<Value>) -> Result<Vec<E>> {
        self.db.with_conn(|conn| query_rows(conn, sql, params))
    }
}

fn select_sql<E: Entity>() -> String {
    format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
}

fn query_rows<E: Entity>(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<Vec<E>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| E::from_row(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
