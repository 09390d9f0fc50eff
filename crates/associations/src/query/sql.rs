//! Query Builder SQL generation

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;

impl<M> QueryBuilder<M> {
    /// Convert the query to a SQL string
    pub fn to_sql(&self) -> String {
        match self.query_type {
            QueryType::Select => self.build_select_sql(),
            QueryType::Insert => self.build_insert_sql(),
            QueryType::Update => self.build_update_sql(),
            QueryType::Delete => self.build_delete_sql(),
        }
    }

    fn build_select_sql(&self) -> String {
        let mut sql = String::from("SELECT ");

        if self.select_fields.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select_fields.join(", "));
        }

        if let Some(table) = &self.table {
            sql.push_str(" FROM ");
            sql.push_str(table);
        }

        for join in &self.joins {
            sql.push_str(&format!(" INNER JOIN {} ON ", join.table));
            let conditions: Vec<String> = join
                .on_conditions
                .iter()
                .map(|(left, right)| format!("{} = {}", left, right))
                .collect();
            sql.push_str(&conditions.join(" AND "));
        }

        self.build_where_clause(&mut sql);
        sql
    }

    fn build_insert_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(table) = &self.table {
            sql.push_str(&format!("INSERT INTO {}", table));

            if !self.set_clauses.is_empty() {
                let columns: Vec<&str> = self
                    .set_clauses
                    .iter()
                    .map(|clause| clause.column.as_str())
                    .collect();
                let values: Vec<String> = self
                    .set_clauses
                    .iter()
                    .map(|clause| match &clause.value {
                        Some(value) => format_value(value),
                        None => "NULL".to_string(),
                    })
                    .collect();

                sql.push_str(&format!(
                    " ({}) VALUES ({})",
                    columns.join(", "),
                    values.join(", ")
                ));
            }
        }

        sql
    }

    fn build_update_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(table) = &self.table {
            sql.push_str(&format!("UPDATE {}", table));

            if !self.set_clauses.is_empty() {
                sql.push_str(" SET ");
                let assignments: Vec<String> = self
                    .set_clauses
                    .iter()
                    .map(|clause| match &clause.value {
                        Some(value) => format!("{} = {}", clause.column, format_value(value)),
                        None => format!("{} = NULL", clause.column),
                    })
                    .collect();
                sql.push_str(&assignments.join(", "));
            }

            self.build_where_clause(&mut sql);
        }

        sql
    }

    fn build_delete_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(table) = &self.table {
            sql.push_str(&format!("DELETE FROM {}", table));
            self.build_where_clause(&mut sql);
        }

        sql
    }

    fn build_where_clause(&self, sql: &mut String) {
        if self.where_conditions.is_empty() {
            return;
        }

        sql.push_str(" WHERE ");
        let conditions: Vec<String> = self
            .where_conditions
            .iter()
            .map(|condition| match condition.operator {
                QueryOperator::IsNull => {
                    format!("{} {}", condition.column, condition.operator)
                }
                QueryOperator::In => {
                    let values: Vec<String> =
                        condition.values.iter().map(format_value).collect();
                    format!("{} IN ({})", condition.column, values.join(", "))
                }
                QueryOperator::Equal => {
                    let value = condition
                        .value
                        .as_ref()
                        .map(format_value)
                        .unwrap_or_else(|| "NULL".to_string());
                    format!("{} = {}", condition.column, value)
                }
            })
            .collect();
        sql.push_str(&conditions.join(" AND "));
    }
}

/// Format a value for SQL
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")), // Escape single quotes
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NULL".to_string(),
        _ => "NULL".to_string(), // Nested arrays and objects are not valid scalars
    }
}

#[cfg(test)]
mod tests {
    use super::super::builder::QueryBuilder;
    use crate::model::Attributes;
    use serde_json::json;

    #[test]
    fn test_select_with_join_and_where() {
        let sql = QueryBuilder::<()>::new()
            .select("tags.*")
            .from("tags")
            .join("taggings", "taggings.tag_id", "tags.id")
            .where_eq("taggings.post_id", 7)
            .to_sql();

        assert_eq!(
            sql,
            "SELECT tags.* FROM tags INNER JOIN taggings ON taggings.tag_id = tags.id \
             WHERE taggings.post_id = 7"
        );
    }

    #[test]
    fn test_select_count() {
        let sql = QueryBuilder::<()>::new()
            .select_count("*")
            .from("taggings")
            .where_eq("post_id", 7)
            .to_sql();

        assert_eq!(sql, "SELECT COUNT(*) FROM taggings WHERE post_id = 7");
    }

    #[test]
    fn test_insert_with_null() {
        let sql = QueryBuilder::<()>::new()
            .insert_into("taggings")
            .set("post_id", 7)
            .set_null("tag_id")
            .to_sql();

        assert_eq!(sql, "INSERT INTO taggings (post_id, tag_id) VALUES (7, NULL)");
    }

    #[test]
    fn test_update_set_null_with_in_filter() {
        let sql = QueryBuilder::<()>::new()
            .update("taggings")
            .set_null("tag_id")
            .where_eq("post_id", 7)
            .where_in("tag_id", vec![1, 2, 3])
            .to_sql();

        assert_eq!(
            sql,
            "UPDATE taggings SET tag_id = NULL WHERE post_id = 7 AND tag_id IN (1, 2, 3)"
        );
    }

    #[test]
    fn test_delete_with_filter() {
        let sql = QueryBuilder::<()>::new()
            .delete_from("taggings")
            .where_in("tag_id", vec![4, 5])
            .to_sql();

        assert_eq!(sql, "DELETE FROM taggings WHERE tag_id IN (4, 5)");
    }

    #[test]
    fn test_where_attributes_dispatches_by_value_shape() {
        let mut attrs = Attributes::new();
        attrs.insert("tag_id".to_string(), json!([1, 2]));
        attrs.insert("kind".to_string(), json!("editorial"));
        attrs.insert("revoked_at".to_string(), json!(null));

        let sql = QueryBuilder::<()>::new()
            .select("*")
            .from("taggings")
            .where_attributes(&attrs)
            .to_sql();

        assert_eq!(
            sql,
            "SELECT * FROM taggings WHERE kind = 'editorial' AND revoked_at IS NULL \
             AND tag_id IN (1, 2)"
        );
    }

    #[test]
    fn test_string_values_are_escaped() {
        let sql = QueryBuilder::<()>::new()
            .select("*")
            .from("tags")
            .where_eq("name", "o'reilly")
            .to_sql();

        assert_eq!(sql, "SELECT * FROM tags WHERE name = 'o''reilly'");
    }
}
