/// Arrow schema definitions for the Spellbook catalog tables.
///
/// The DuckDB store derives its DDL from these and validates query results
/// against them. List-valued rule fields (`examples`, `keywords`,
/// `related_rules`) are stored as JSON text; timestamps as epoch milliseconds.
pub mod catalog {
    use arrow::datatypes::{DataType, Field, Schema};

    pub const RULES_TABLE: &str = "rules";
    pub const CARDS_TABLE: &str = "cards";
    pub const METADATA_TABLE: &str = "database_metadata";

    /// Schema for comprehensive-rules records.
    pub fn rules_schema() -> Schema {
        Schema::new(vec![
            Field::new("rule_number", DataType::Utf8, false),
            Field::new("sort_key", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("examples", DataType::Utf8, false),
            Field::new("keywords", DataType::Utf8, false),
            Field::new("chapter", DataType::Utf8, false),
            Field::new("section", DataType::Utf8, false),
            Field::new("subsection", DataType::Utf8, false),
            Field::new("related_rules", DataType::Utf8, false),
            Field::new("created_at_ms", DataType::Int64, false),
        ])
    }

    /// Schema for the card table filled by the bulk loader.
    pub fn cards_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("set_code", DataType::Utf8, false),
            Field::new("collector_number", DataType::Utf8, false),
            Field::new("rarity", DataType::Utf8, false),
            Field::new("type_line", DataType::Utf8, true),
            Field::new("mana_cost", DataType::Utf8, true),
            Field::new("oracle_text", DataType::Utf8, true),
        ])
    }

    /// Schema for the singleton refresh metadata row.
    pub fn metadata_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("last_updated_ms", DataType::Int64, false),
            Field::new("total_cards", DataType::Int64, false),
            Field::new("description", DataType::Utf8, false),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::catalog;

    #[test]
    fn rules_schema_has_expected_fields() {
        let schema = catalog::rules_schema();
        assert_eq!(schema.fields().len(), 10);
        assert!(schema.field_with_name("rule_number").is_ok());
        assert!(schema.field_with_name("sort_key").is_ok());
        assert!(schema.field_with_name("created_at_ms").is_ok());
    }

    #[test]
    fn cards_schema_has_expected_fields() {
        let schema = catalog::cards_schema();
        assert_eq!(schema.fields().len(), 8);
        assert!(schema.field_with_name("rarity").is_ok());
    }

    #[test]
    fn metadata_schema_keyed_by_id() {
        let schema = catalog::metadata_schema();
        assert_eq!(schema.field(0).name(), "id");
        assert!(!schema.field(0).is_nullable());
    }
}
