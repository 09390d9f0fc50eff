//! Postgres Storage - sqlx-backed collaborators for through associations

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Pool, Postgres, Row};

use crate::error::{ModelError, ModelResult};
use crate::model::{Attributes, Record};
use crate::query::sql::format_value;
use crate::query::QueryBuilder;

use super::reflection::{AssociationMacro, ThroughReflection};
use super::traits::{CounterStore, ThroughStorage};

/// Through-association storage over a Postgres pool.
///
/// Scoped to one owner at construction time: for a has-many through hop the
/// scope is the owner foreign key on the join table; for a belongs-to hop it
/// is the join row the owner points at.
pub struct PgThroughStorage<T> {
    pool: Pool<Postgres>,
    reflection: ThroughReflection,
    scope_column: String,
    scope_value: Value,
    _phantom: PhantomData<T>,
}

impl<T: Record> PgThroughStorage<T> {
    /// Create storage scoped to the given owner
    pub fn for_owner<O: Record>(
        pool: Pool<Postgres>,
        reflection: ThroughReflection,
        owner: &O,
    ) -> ModelResult<Self> {
        let (scope_column, scope_value) = match reflection.through.macro_kind {
            AssociationMacro::HasMany => {
                let key = owner.primary_key().ok_or(ModelError::MissingPrimaryKey)?;
                (reflection.through.foreign_key.clone(), key)
            }
            AssociationMacro::BelongsTo => {
                let key = owner
                    .read_attribute(&reflection.through.foreign_key)
                    .unwrap_or(Value::Null);
                ("id".to_string(), key)
            }
        };

        Ok(Self {
            pool,
            reflection,
            scope_column,
            scope_value,
            _phantom: PhantomData,
        })
    }

    fn qualified(&self, column: &str) -> String {
        format!("{}.{}", self.reflection.join_table, column)
    }

    /// Attribute filter with join-table-qualified column names
    fn qualify(&self, attrs: &Attributes) -> Attributes {
        attrs
            .iter()
            .map(|(column, value)| (self.qualified(column), value.clone()))
            .collect()
    }

    fn scoped_join_query(&self) -> QueryBuilder<T> {
        QueryBuilder::new()
            .from(T::table_name())
            .join(
                &self.reflection.join_table,
                &self.qualified(&self.reflection.source.foreign_key),
                &format!("{}.{}", T::table_name(), T::primary_key_name()),
            )
            .where_eq(&self.qualified(&self.scope_column), self.scope_value.clone())
            .where_attributes(&self.qualify(&self.reflection.scope_conditions))
    }

    fn targets_sql(&self) -> String {
        self.scoped_join_query()
            .select(&format!("{}.*", T::table_name()))
            .to_sql()
    }

    fn count_sql(&self) -> String {
        self.scoped_join_query().select_count("*").to_sql()
    }

    fn scoped_row_query(&self, filter: &Attributes) -> QueryBuilder<()> {
        QueryBuilder::new()
            .where_eq(&self.qualified(&self.scope_column), self.scope_value.clone())
            .where_attributes(&self.qualify(filter))
    }

    fn row_ids_sql(&self, filter: &Attributes) -> String {
        self.scoped_row_query(filter)
            .select(&self.qualified("id"))
            .from(&self.reflection.join_table)
            .to_sql()
    }

    fn delete_sql(&self, filter: &Attributes) -> String {
        self.scoped_row_query(filter)
            .delete_from(&self.reflection.join_table)
            .to_sql()
    }

    fn update_sql(&self, filter: &Attributes, changes: &Attributes) -> String {
        self.scoped_row_query(filter)
            .update(&self.reflection.join_table)
            .set_attributes(changes)
            .to_sql()
    }

    fn insert_sql(&self, attrs: &Attributes) -> ModelResult<String> {
        if self.reflection.through.macro_kind == AssociationMacro::BelongsTo {
            return Err(ModelError::Configuration(format!(
                "cannot create join rows through the belongs_to association '{}'",
                self.reflection.through.name
            )));
        }

        let mut row = attrs.clone();
        row.insert(
            self.reflection.through.foreign_key.clone(),
            self.scope_value.clone(),
        );

        Ok(QueryBuilder::<()>::new()
            .insert_into(&self.reflection.join_table)
            .set_attributes(&row)
            .to_sql())
    }
}

#[async_trait]
impl<T> ThroughStorage for PgThroughStorage<T>
where
    T: Record + Clone + 'static,
{
    type Target = T;

    async fn save_target(&self, target: &mut T, _validate: bool) -> ModelResult<bool> {
        // Validation hooks belong to the entity layer; at this seam a save
        // either persists or errors.
        if !target.is_new_record() {
            return Ok(true);
        }

        let attrs: Attributes = target
            .to_attributes()
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect();
        let sql = format!(
            "{} RETURNING *",
            QueryBuilder::<()>::new()
                .insert_into(T::table_name())
                .set_attributes(&attrs)
                .to_sql()
        );
        tracing::debug!("saving new {} record: {}", T::model_name(), sql);

        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        *target = T::from_row(&row)?;
        Ok(true)
    }

    async fn create(&self, attrs: Attributes) -> ModelResult<()> {
        let sql = self.insert_sql(&attrs)?;
        tracing::debug!("creating join row: {}", sql);
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn destroy_all(&self, filter: Attributes) -> ModelResult<usize> {
        let rows = sqlx::query(&self.row_ids_sql(&filter))
            .fetch_all(&self.pool)
            .await?;

        let mut count = 0;
        for row in rows {
            let id: i64 = row.try_get(0).map_err(|e| {
                ModelError::Database(format!(
                    "join table {} has no readable id column: {}",
                    self.reflection.join_table, e
                ))
            })?;
            let sql = QueryBuilder::<()>::new()
                .delete_from(&self.reflection.join_table)
                .where_eq("id", id)
                .to_sql();
            sqlx::query(&sql).execute(&self.pool).await?;
            count += 1;
        }

        tracing::debug!(
            "destroyed {} rows from {}",
            count,
            self.reflection.join_table
        );
        Ok(count)
    }

    async fn update_all(&self, filter: Attributes, changes: Attributes) -> ModelResult<usize> {
        let sql = self.update_sql(&filter, &changes);
        tracing::debug!("updating join rows: {}", sql);
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }

    async fn delete_all(&self, filter: Attributes) -> ModelResult<usize> {
        let sql = self.delete_sql(&filter);
        tracing::debug!("deleting join rows: {}", sql);
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }

    async fn load_targets(&self) -> ModelResult<Vec<T>> {
        let sql = self.targets_sql();
        tracing::debug!("loading association targets: {}", sql);

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut targets = Vec::with_capacity(rows.len());
        for row in &rows {
            targets.push(T::from_row(row)?);
        }
        Ok(targets)
    }

    async fn count(&self) -> ModelResult<i64> {
        let sql = self.count_sql();
        tracing::debug!("counting association targets: {}", sql);

        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get(0)?;
        Ok(count)
    }
}

/// Counter store over the owner's row in Postgres.
///
/// Adjustments are single-attribute `SET attr = attr + delta` updates; the
/// owner's numeric attributes are mirrored in memory so reads never query.
pub struct PgCounterStore {
    pool: Pool<Postgres>,
    table: String,
    primary_key: String,
    owner_key: Value,
    cached: RwLock<HashMap<String, i64>>,
}

impl PgCounterStore {
    /// Create a counter store for a persisted owner record
    pub fn for_owner<O: Record>(pool: Pool<Postgres>, owner: &O) -> ModelResult<Self> {
        let owner_key = owner.primary_key().ok_or(ModelError::MissingPrimaryKey)?;
        let cached = owner
            .to_attributes()
            .into_iter()
            .filter_map(|(name, value)| value.as_i64().map(|n| (name, n)))
            .collect();

        Ok(Self {
            pool,
            table: O::table_name().to_string(),
            primary_key: O::primary_key_name().to_string(),
            owner_key,
            cached: RwLock::new(cached),
        })
    }

    fn adjust_sql(&self, attribute: &str, delta: i64) -> String {
        format!(
            "UPDATE {} SET {} = COALESCE({}, 0) + {} WHERE {} = {}",
            self.table,
            attribute,
            attribute,
            delta,
            self.primary_key,
            format_value(&self.owner_key)
        )
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    fn read(&self, attribute: &str) -> Option<i64> {
        self.cached.read().ok()?.get(attribute).copied()
    }

    async fn adjust(&self, attribute: &str, delta: i64) -> ModelResult<()> {
        let sql = self.adjust_sql(attribute, delta);
        tracing::debug!("adjusting counter cache: {}", sql);
        sqlx::query(&sql).execute(&self.pool).await?;

        if let Ok(mut cached) = self.cached.write() {
            *cached.entry(attribute.to_string()).or_insert(0) += delta;
        }
        Ok(())
    }
}
