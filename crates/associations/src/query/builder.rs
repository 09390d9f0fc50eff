//! Query Builder - Core builder implementation

use std::marker::PhantomData;

use serde_json::Value;

use crate::model::Attributes;

use super::types::*;

/// Query builder for constructing association-scoped database queries
#[derive(Debug)]
pub struct QueryBuilder<M = ()> {
    pub(crate) query_type: QueryType,
    pub(crate) select_fields: Vec<String>,
    pub(crate) table: Option<String>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) where_conditions: Vec<WhereCondition>,
    pub(crate) set_clauses: Vec<SetClause>,
    _phantom: PhantomData<M>,
}

impl<M> Clone for QueryBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            query_type: self.query_type.clone(),
            select_fields: self.select_fields.clone(),
            table: self.table.clone(),
            joins: self.joins.clone(),
            where_conditions: self.where_conditions.clone(),
            set_clauses: self.set_clauses.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<M> Default for QueryBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> QueryBuilder<M> {
    /// Create a new query builder
    pub fn new() -> Self {
        Self {
            query_type: QueryType::Select,
            select_fields: Vec::new(),
            table: None,
            joins: Vec::new(),
            where_conditions: Vec::new(),
            set_clauses: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Add SELECT fields to the query
    pub fn select(mut self, fields: &str) -> Self {
        if fields == "*" {
            self.select_fields.push("*".to_string());
        } else {
            self.select_fields
                .extend(fields.split(',').map(|f| f.trim().to_string()));
        }
        self
    }

    /// Add a COUNT aggregate to the SELECT list
    pub fn select_count(mut self, column: &str) -> Self {
        self.select_fields.push(format!("COUNT({})", column));
        self
    }

    /// Set the FROM table
    pub fn from(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Add INNER JOIN to the query
    pub fn join(mut self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.joins.push(JoinClause {
            table: table.to_string(),
            on_conditions: vec![(left_col.to_string(), right_col.to_string())],
        });
        self
    }

    /// Add WHERE condition with equality
    pub fn where_eq<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::Equal,
            value: Some(value.into()),
            values: Vec::new(),
        });
        self
    }

    /// Add WHERE condition with IN
    pub fn where_in<T: Into<Value>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::In,
            value: None,
            values: values.into_iter().map(|v| v.into()).collect(),
        });
        self
    }

    /// Add WHERE condition with IS NULL
    pub fn where_null(mut self, column: &str) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::IsNull,
            value: None,
            values: Vec::new(),
        });
        self
    }

    /// Narrow the query by an attribute filter.
    ///
    /// Array values become IN conditions, NULL values become IS NULL checks,
    /// and everything else an equality. Attributes are applied in sorted
    /// column order so generated SQL is stable.
    pub fn where_attributes(mut self, attrs: &Attributes) -> Self {
        let mut columns: Vec<&String> = attrs.keys().collect();
        columns.sort();

        for column in columns {
            self = match &attrs[column] {
                Value::Array(values) => self.where_in(column.as_str(), values.clone()),
                Value::Null => self.where_null(column.as_str()),
                value => self.where_eq(column.as_str(), value.clone()),
            };
        }
        self
    }

    /// Start an INSERT query
    pub fn insert_into(mut self, table: &str) -> Self {
        self.query_type = QueryType::Insert;
        self.table = Some(table.to_string());
        self
    }

    /// Start an UPDATE query
    pub fn update(mut self, table: &str) -> Self {
        self.query_type = QueryType::Update;
        self.table = Some(table.to_string());
        self
    }

    /// Start a DELETE query
    pub fn delete_from(mut self, table: &str) -> Self {
        self.query_type = QueryType::Delete;
        self.table = Some(table.to_string());
        self
    }

    /// Set a column value (for INSERT/UPDATE)
    pub fn set<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.set_clauses.push(SetClause {
            column: column.to_string(),
            value: Some(value.into()),
        });
        self
    }

    /// Set a column to NULL (for INSERT/UPDATE)
    pub fn set_null(mut self, column: &str) -> Self {
        self.set_clauses.push(SetClause {
            column: column.to_string(),
            value: None,
        });
        self
    }

    /// Set columns from an attribute map, in sorted column order.
    pub fn set_attributes(mut self, attrs: &Attributes) -> Self {
        let mut columns: Vec<&String> = attrs.keys().collect();
        columns.sort();

        for column in columns {
            self = match &attrs[column] {
                Value::Null => self.set_null(column.as_str()),
                value => self.set(column.as_str(), value.clone()),
            };
        }
        self
    }
}
