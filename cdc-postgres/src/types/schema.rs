use pg_escape::quote_identifier;
use std::fmt;
use thiserror::Error;
use tokio_postgres::types::Type;

/// Errors that can occur while interpreting a table schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// An operation required primary-key columns but the table declares none.
    #[error("table '{0}' has no primary key columns")]
    MissingPrimaryKey(String),
}

/// A fully qualified table name consisting of an optional catalog, a schema
/// and a table name.
///
/// Postgres itself only ever addresses tables as `schema.name`; the catalog
/// slot exists because change events may originate from databases that carry
/// a three-part name, and it is preserved so the dialect value can format it.
#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Ord)]
pub struct TableName {
    /// The catalog containing the schema, if the source database has one.
    pub catalog: Option<String>,
    /// The schema name containing the table.
    pub schema: String,
    /// The name of the table within the schema.
    pub name: String,
}

impl TableName {
    pub fn new(schema: String, name: String) -> TableName {
        Self {
            catalog: None,
            schema,
            name,
        }
    }

    pub fn with_catalog(catalog: String, schema: String, name: String) -> TableName {
        Self {
            catalog: Some(catalog),
            schema,
            name,
        }
    }

    /// Returns the table name as a properly quoted Postgres identifier.
    ///
    /// Schema and table names are escaped according to Postgres identifier
    /// quoting rules. The catalog part is omitted since Postgres statements
    /// cannot reference a foreign catalog.
    pub fn as_quoted_identifier(&self) -> String {
        let quoted_schema = quote_identifier(&self.schema);
        let quoted_name = quote_identifier(&self.name);

        format!("{quoted_schema}.{quoted_name}")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(catalog) = &self.catalog {
            write!(f, "{catalog}.")?;
        }
        f.write_fmt(format_args!("{0}.{1}", self.schema, self.name))
    }
}

/// Represents the schema of a single column in a target table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColumnSchema {
    /// The name of the column.
    pub name: String,
    /// The Postgres data type of the column.
    pub typ: Type,
    /// The 1-based ordinal position of the column in the table.
    pub ordinal_position: i32,
    /// The 1-based ordinal position of this column in the primary key, or
    /// None if not a primary key.
    pub primary_key_ordinal_position: Option<i32>,
    /// Whether the column can contain NULL values.
    pub nullable: bool,
}

impl ColumnSchema {
    /// Creates a new [`ColumnSchema`] with all fields specified.
    pub fn new(
        name: String,
        typ: Type,
        ordinal_position: i32,
        primary_key_ordinal_position: Option<i32>,
        nullable: bool,
    ) -> ColumnSchema {
        Self {
            name,
            typ,
            ordinal_position,
            primary_key_ordinal_position,
            nullable,
        }
    }

    /// Returns whether this column is part of the table's primary key.
    pub fn primary_key(&self) -> bool {
        self.primary_key_ordinal_position.is_some()
    }

    /// Returns whether values of this column require binary-safe encoding
    /// before they can travel through a text-based load channel.
    pub fn is_binary(&self) -> bool {
        self.typ == Type::BYTEA
    }
}

/// Represents the complete schema of a target table.
///
/// A value of this type is immutable for the lifetime of an apply session
/// and is shared between sessions behind an `Arc`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TableSchema {
    /// The fully qualified name of the table.
    pub name: TableName,
    /// The column schemas in ordinal order.
    pub column_schemas: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(name: TableName, column_schemas: Vec<ColumnSchema>) -> TableSchema {
        Self {
            name,
            column_schemas,
        }
    }

    /// Returns whether any column of this table requires binary-safe encoding.
    pub fn has_binary_columns(&self) -> bool {
        self.column_schemas.iter().any(|cs| cs.is_binary())
    }

    /// Returns the primary-key columns of this table in key ordinal order.
    ///
    /// Fails when the table declares no primary key, since callers use the
    /// result to locate individual rows.
    pub fn primary_key_columns(&self) -> Result<Vec<&ColumnSchema>, SchemaError> {
        let mut columns: Vec<&ColumnSchema> = self
            .column_schemas
            .iter()
            .filter(|cs| cs.primary_key())
            .collect();

        if columns.is_empty() {
            return Err(SchemaError::MissingPrimaryKey(self.name.to_string()));
        }

        columns.sort_by_key(|cs| cs.primary_key_ordinal_position);

        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_table() -> TableSchema {
        TableSchema::new(
            TableName::new("public".to_string(), "orders".to_string()),
            vec![
                ColumnSchema::new("id".to_string(), Type::INT8, 1, Some(1), false),
                ColumnSchema::new("note".to_string(), Type::TEXT, 2, None, true),
                ColumnSchema::new("payload".to_string(), Type::BYTEA, 3, None, true),
            ],
        )
    }

    #[test]
    fn quoted_identifier_plain_names() {
        let name = TableName::new("public".to_string(), "orders".to_string());
        assert_eq!(name.as_quoted_identifier(), "public.orders");
    }

    #[test]
    fn quoted_identifier_reserved_and_mixed_case() {
        let name = TableName::new("Public".to_string(), "order table".to_string());
        assert_eq!(name.as_quoted_identifier(), "\"Public\".\"order table\"");
    }

    #[test]
    fn display_includes_catalog_when_present() {
        let name =
            TableName::with_catalog("db".to_string(), "public".to_string(), "orders".to_string());
        assert_eq!(name.to_string(), "db.public.orders");
    }

    #[test]
    fn bytea_columns_are_binary() {
        let table = orders_table();
        assert!(!table.column_schemas[0].is_binary());
        assert!(!table.column_schemas[1].is_binary());
        assert!(table.column_schemas[2].is_binary());
        assert!(table.has_binary_columns());
    }

    #[test]
    fn primary_key_columns_sorted_by_key_ordinal() {
        let table = TableSchema::new(
            TableName::new("public".to_string(), "pairs".to_string()),
            vec![
                ColumnSchema::new("b".to_string(), Type::INT4, 1, Some(2), false),
                ColumnSchema::new("a".to_string(), Type::INT4, 2, Some(1), false),
            ],
        );

        let keys = table.primary_key_columns().unwrap();
        let names: Vec<&str> = keys.iter().map(|cs| cs.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn primary_key_columns_missing() {
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

        let err = table.primary_key_columns().unwrap_err();
        assert!(matches!(err, SchemaError::MissingPrimaryKey(_)));
    }
}
