use crate::types::TableName;

/// Capability description of a target database dialect.
///
/// Apply sessions are parameterized by a value of this type instead of
/// per-database subclasses: the quoting token, name separators and the
/// streaming-support flag are all the variation the bulk writer needs.
#[derive(Debug, Clone)]
pub struct DialectInfo {
    /// Token wrapped around identifiers that need quoting.
    pub identifier_quote: &'static str,
    /// Separator between catalog and schema in a qualified name.
    pub catalog_separator: &'static str,
    /// Separator between schema and table in a qualified name.
    pub schema_separator: &'static str,
    /// Whether the target supports a streaming bulk-load channel at all.
    pub supports_bulk_copy: bool,
}

impl DialectInfo {
    /// Capabilities of a Postgres target.
    pub fn postgres() -> DialectInfo {
        Self {
            identifier_quote: "\"",
            catalog_separator: ".",
            schema_separator: ".",
            supports_bulk_copy: true,
        }
    }

    /// Quotes a single identifier, doubling any embedded quote tokens.
    pub fn quote_identifier(&self, identifier: &str) -> String {
        let quote = self.identifier_quote;
        let doubled = format!("{quote}{quote}");

        format!("{quote}{}{quote}", identifier.replace(quote, &doubled))
    }

    /// Formats the fully qualified, quoted name of a table.
    pub fn qualified_table_name(&self, table_name: &TableName) -> String {
        let mut qualified = String::new();

        if let Some(catalog) = &table_name.catalog {
            qualified.push_str(&self.quote_identifier(catalog));
            qualified.push_str(self.catalog_separator);
        }

        qualified.push_str(&self.quote_identifier(&table_name.schema));
        qualified.push_str(self.schema_separator);
        qualified.push_str(&self.quote_identifier(&table_name.name));

        qualified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_qualified_name() {
        let dialect = DialectInfo::postgres();
        let name = TableName::new("public".to_string(), "orders".to_string());
        assert_eq!(dialect.qualified_table_name(&name), "\"public\".\"orders\"");
    }

    #[test]
    fn qualified_name_with_catalog() {
        let dialect = DialectInfo::postgres();
        let name =
            TableName::with_catalog("db".to_string(), "public".to_string(), "orders".to_string());
        assert_eq!(
            dialect.qualified_table_name(&name),
            "\"db\".\"public\".\"orders\""
        );
    }

    #[test]
    fn embedded_quote_tokens_are_doubled() {
        let dialect = DialectInfo::postgres();
        assert_eq!(dialect.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
