use std::sync::Arc;

use pg_escape::{quote_identifier, quote_literal};
use tokio_postgres::Client;
use tracing::debug;

use crate::bail;
use crate::error::{ApplyResult, ErrorKind};
use crate::types::{Batch, ChangeEvent, ColumnSchema, EventKind, TableSchema};
use crate::writer::base::EventWriter;

/// Row-by-row statement writer for Postgres targets.
///
/// Applies each change event as one generated SQL statement on the borrowed
/// target connection. This is the fallback path behind
/// [`crate::writer::BulkApplyWriter`] for the operations a streaming channel
/// cannot express.
pub struct PgStatementWriter {
    client: Arc<Client>,
    table: Option<Arc<TableSchema>>,
}

impl PgStatementWriter {
    pub fn new(client: Arc<Client>) -> PgStatementWriter {
        Self {
            client,
            table: None,
        }
    }

    fn current_table(&self) -> ApplyResult<&TableSchema> {
        let Some(table) = self.table.as_deref() else {
            bail!(
                ErrorKind::InvalidState,
                "Cannot apply a change event outside of a table scope"
            );
        };

        Ok(table)
    }
}

impl EventWriter for PgStatementWriter {
    fn name() -> &'static str {
        "pg_statement"
    }

    async fn start_batch(&mut self, _batch: &Batch) -> ApplyResult<()> {
        Ok(())
    }

    async fn start_table(&mut self, table: Arc<TableSchema>) -> ApplyResult<()> {
        self.table = Some(table);

        Ok(())
    }

    async fn write(&mut self, event: ChangeEvent) -> ApplyResult<()> {
        let statement = match event.kind {
            EventKind::Insert => build_insert(self.current_table()?, &event)?,
            EventKind::Update => build_update(self.current_table()?, &event)?,
            EventKind::Delete => build_delete(self.current_table()?, &event)?,
            EventKind::Sql => {
                let Some(Some(statement)) = event.row_data.first().cloned() else {
                    bail!(
                        ErrorKind::EncodingError,
                        "Sql event carries no statement text"
                    );
                };
                statement
            }
            EventKind::Create => {
                // Schema synchronization is handled outside the apply path.
                debug!("skipping schema create event");
                return Ok(());
            }
        };

        self.client.simple_query(&statement).await?;

        Ok(())
    }

    async fn end_table(&mut self) -> ApplyResult<()> {
        self.table = None;

        Ok(())
    }

    async fn end_batch(&mut self, _in_error: bool) -> ApplyResult<()> {
        Ok(())
    }
}

/// Formats a field value as a SQL literal; NULL travels as the keyword.
fn literal(value: &Option<String>) -> String {
    match value {
        Some(value) => quote_literal(value).to_string(),
        None => "null".to_string(),
    }
}

/// Formats an equality predicate for a key column, using `is null` when the
/// key value is NULL.
fn predicate(column: &ColumnSchema, value: &Option<String>) -> String {
    let name = quote_identifier(&column.name);
    match value {
        Some(value) => format!("{name} = {}", quote_literal(value)),
        None => format!("{name} is null"),
    }
}

fn check_arity(table: &TableSchema, event: &ChangeEvent) -> ApplyResult<()> {
    if event.row_data.len() != table.column_schemas.len() {
        bail!(
            ErrorKind::EncodingError,
            "Row has a different number of fields than the target table has columns",
            format!(
                "row has {} fields, table has {} columns",
                event.row_data.len(),
                table.column_schemas.len()
            )
        );
    }

    Ok(())
}

/// Resolves the primary-key columns of the table together with their values
/// for this event.
///
/// Prefers the event's explicit key values; falls back to the key cells of
/// the row data when the capture layer did not send them separately.
fn key_values<'a>(
    table: &'a TableSchema,
    event: &'a ChangeEvent,
) -> ApplyResult<Vec<(&'a ColumnSchema, &'a Option<String>)>> {
    let key_columns = table.primary_key_columns()?;

    if !event.pk_data.is_empty() {
        if event.pk_data.len() != key_columns.len() {
            bail!(
                ErrorKind::EncodingError,
                "Event carries a different number of key values than the table has key columns",
                format!(
                    "event has {} key values, table has {} key columns",
                    event.pk_data.len(),
                    key_columns.len()
                )
            );
        }

        return Ok(key_columns.into_iter().zip(event.pk_data.iter()).collect());
    }

    check_arity(table, event)?;

    Ok(key_columns
        .into_iter()
        .map(|column| {
            let index = (column.ordinal_position - 1) as usize;
            (column, &event.row_data[index])
        })
        .collect())
}

fn build_insert(table: &TableSchema, event: &ChangeEvent) -> ApplyResult<String> {
    check_arity(table, event)?;

    let columns = table
        .column_schemas
        .iter()
        .map(|cs| quote_identifier(&cs.name).to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let values = event
        .row_data
        .iter()
        .map(literal)
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "insert into {} ({columns}) values ({values})",
        table.name.as_quoted_identifier()
    ))
}

fn build_update(table: &TableSchema, event: &ChangeEvent) -> ApplyResult<String> {
    check_arity(table, event)?;

    let mut assignments: Vec<String> = table
        .column_schemas
        .iter()
        .zip(event.row_data.iter())
        .filter(|(cs, _)| !cs.primary_key())
        .map(|(cs, value)| format!("{} = {}", quote_identifier(&cs.name), literal(value)))
        .collect();

    // A table whose every column is part of the key leaves nothing to
    // assign above; the update then moves the key itself, filtered on the
    // old key values.
    if assignments.is_empty() {
        assignments = table
            .column_schemas
            .iter()
            .zip(event.row_data.iter())
            .map(|(cs, value)| format!("{} = {}", quote_identifier(&cs.name), literal(value)))
            .collect();
    }

    let assignments = assignments.join(", ");
    let filter = key_values(table, event)?
        .into_iter()
        .map(|(column, value)| predicate(column, value))
        .collect::<Vec<_>>()
        .join(" and ");

    Ok(format!(
        "update {} set {assignments} where {filter}",
        table.name.as_quoted_identifier()
    ))
}

fn build_delete(table: &TableSchema, event: &ChangeEvent) -> ApplyResult<String> {
    if event.pk_data.is_empty() {
        bail!(
            ErrorKind::EncodingError,
            "Delete event carries no key values"
        );
    }

    let filter = key_values(table, event)?
        .into_iter()
        .map(|(column, value)| predicate(column, value))
        .collect::<Vec<_>>()
        .join(" and ");

    Ok(format!(
        "delete from {} where {filter}",
        table.name.as_quoted_identifier()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableName;
    use tokio_postgres::types::Type;

    fn orders_table() -> TableSchema {
        TableSchema::new(
            TableName::new("public".to_string(), "orders".to_string()),
            vec![
                ColumnSchema::new("id".to_string(), Type::INT8, 1, Some(1), false),
                ColumnSchema::new("note".to_string(), Type::TEXT, 2, None, true),
            ],
        )
    }

    #[test]
    fn insert_statement_quotes_literals() {
        let event = ChangeEvent::insert(vec![Some("1".to_string()), Some("it's".to_string())]);
        let sql = build_insert(&orders_table(), &event).unwrap();
        assert_eq!(
            sql,
            "insert into public.orders (id, note) values ('1', 'it''s')"
        );
    }

    #[test]
    fn insert_statement_renders_null() {
        let event = ChangeEvent::insert(vec![Some("1".to_string()), None]);
        let sql = build_insert(&orders_table(), &event).unwrap();
        assert_eq!(sql, "insert into public.orders (id, note) values ('1', null)");
    }

    #[test]
    fn update_statement_uses_event_key_values() {
        let event = ChangeEvent::update(
            vec![Some("2".to_string()), Some("changed".to_string())],
            vec![Some("1".to_string())],
        );
        let sql = build_update(&orders_table(), &event).unwrap();
        assert_eq!(
            sql,
            "update public.orders set note = 'changed' where id = '1'"
        );
    }

    #[test]
    fn update_statement_falls_back_to_row_key_cells() {
        let event = ChangeEvent::update(
            vec![Some("1".to_string()), Some("changed".to_string())],
            vec![],
        );
        let sql = build_update(&orders_table(), &event).unwrap();
        assert_eq!(
            sql,
            "update public.orders set note = 'changed' where id = '1'"
        );
    }

    #[test]
    fn update_statement_on_all_key_table_assigns_the_key() {
        let table = TableSchema::new(
            TableName::new("public".to_string(), "pairs".to_string()),
            vec![
                ColumnSchema::new("a".to_string(), Type::INT4, 1, Some(1), false),
                ColumnSchema::new("b".to_string(), Type::INT4, 2, Some(2), false),
            ],
        );
        let event = ChangeEvent::update(
            vec![Some("3".to_string()), Some("4".to_string())],
            vec![Some("1".to_string()), Some("2".to_string())],
        );
        let sql = build_update(&table, &event).unwrap();
        assert_eq!(
            sql,
            "update public.pairs set a = '3', b = '4' where a = '1' and b = '2'"
        );
    }

    #[test]
    fn delete_statement_filters_on_key() {
        let event = ChangeEvent::delete(vec![Some("1".to_string())]);
        let sql = build_delete(&orders_table(), &event).unwrap();
        assert_eq!(sql, "delete from public.orders where id = '1'");
    }

    #[test]
    fn delete_without_key_values_is_rejected() {
        let event = ChangeEvent::delete(vec![]);
        let err = build_delete(&orders_table(), &event).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::EncodingError));
    }

    #[test]
    fn update_without_primary_key_is_rejected() {
        let table = TableSchema::new(
            TableName::new("public".to_string(), "log".to_string()),
            vec![ColumnSchema::new(
                "line".to_string(),
                Type::TEXT,
                1,
                None,
                true,
            )],
        );
        let event = ChangeEvent::update(vec![Some("a".to_string())], vec![]);
        let err = build_update(&table, &event).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ValidationError));
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let event = ChangeEvent::insert(vec![Some("1".to_string())]);
        let err = build_insert(&orders_table(), &event).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::EncodingError));
    }
}
