//! Query Builder Types - Core types and enums for query building

use std::fmt;

use serde_json::Value;

/// Query operator types
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Equal,
    In,
    IsNull,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::In => write!(f, "IN"),
            QueryOperator::IsNull => write!(f, "IS NULL"),
        }
    }
}

/// Where clause condition
#[derive(Debug, Clone)]
pub struct WhereCondition {
    pub column: String,
    pub operator: QueryOperator,
    pub value: Option<Value>,
    pub values: Vec<Value>, // For IN
}

/// Join clause
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub table: String,
    pub on_conditions: Vec<(String, String)>, // (left_column, right_column)
}

/// Set clause for UPDATE and INSERT operations
#[derive(Debug, Clone)]
pub struct SetClause {
    pub column: String,
    pub value: Option<Value>, // None for NULL values
}

/// Query types supported by the builder
#[derive(Debug, Clone, PartialEq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
}
