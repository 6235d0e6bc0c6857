//! Tests for native ORDER BY planning

use super::*;
use crate::mock_transport::MockTransport;
use dynq_core::{IndexDescription, KeySchemaElement, QuerySpec, SortDirection, TableDescription};
use pretty_assertions::assert_eq;

fn orders_table() -> TableDescription {
    TableDescription::new("T")
        .with_key(KeySchemaElement::hash("pk"))
        .with_key(KeySchemaElement::range("sk"))
        .with_global_index(IndexDescription::new(
            "ByStatus",
            vec![
                KeySchemaElement::hash("status"),
                KeySchemaElement::range("createdAt"),
            ],
        ))
}

// =============================================================================
// Statement inspection tests
// =============================================================================

mod inspection_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_has_order_by_is_case_insensitive() {
        assert!(has_order_by("select * from t where a = 1 order by b"));
        assert!(has_order_by("SELECT * FROM t ORDER BY b"));
        assert!(!has_order_by("SELECT * FROM t WHERE orderby = 1"));
    }

    #[test]
    fn test_extract_quoted_table_and_index() {
        assert_eq!(
            extract_table_and_index(r#"SELECT * FROM "Orders" INDEX "ByStatus" WHERE x = 1"#),
            Some(("Orders".to_string(), Some("ByStatus".to_string())))
        );
        assert_eq!(
            extract_table_and_index(r#"select * from "My Table" where x = 1"#),
            Some(("My Table".to_string(), None))
        );
    }

    #[test]
    fn test_extract_unquoted_table() {
        assert_eq!(
            extract_table_and_index("SELECT * FROM Orders INDEX ByStatus"),
            Some(("Orders".to_string(), Some("ByStatus".to_string())))
        );
        assert_eq!(
            extract_table_and_index("SELECT * FROM Orders;"),
            Some(("Orders".to_string(), None))
        );
        assert_eq!(
            extract_table_and_index("SELECT * FROM 'Orders' WHERE a = 1"),
            Some(("Orders".to_string(), None))
        );
    }

    #[test]
    fn test_extract_without_from() {
        assert_eq!(extract_table_and_index("EXISTS(SELECT 1)"), None);
    }

    #[test]
    fn test_partition_key_equality() {
        assert!(partition_key_has_equality(r#"SELECT * FROM "T" WHERE "pk" = 'x'"#, "pk"));
        assert!(partition_key_has_equality("SELECT * FROM T WHERE pk='x'", "pk"));
        assert!(partition_key_has_equality(r#"SELECT * FROM T WHERE "PK" = 'x'"#, "pk"));
    }

    #[test]
    fn test_partition_key_without_equality() {
        let cases = [
            r#"SELECT * FROM "T" WHERE "pk" > 'x'"#,
            r#"SELECT * FROM "T" WHERE "pk" >= 'x'"#,
            r#"SELECT * FROM "T" WHERE "pk" <> 'x'"#,
            r#"SELECT * FROM "T" WHERE "pk" IN ['a', 'b']"#,
            r#"SELECT * FROM "T" WHERE "pk" BETWEEN 'a' AND 'b'"#,
            r#"SELECT * FROM "T" WHERE "sk" = 'x'"#,
        ];
        for statement in cases {
            assert!(!partition_key_has_equality(statement, "pk"), "{}", statement);
        }
        assert!(!partition_key_has_equality("SELECT * FROM T WHERE pk = 1", ""));
    }

    #[test]
    fn test_partition_key_with_regex_metacharacters() {
        assert!(partition_key_has_equality(r#"SELECT * FROM T WHERE "a.b" = 1"#, "a.b"));
        assert!(!partition_key_has_equality(r#"SELECT * FROM T WHERE "axb" = 1"#, "a.b"));
    }

    #[test]
    fn test_partition_key_must_be_whole_word() {
        assert!(!partition_key_has_equality("SELECT * FROM T WHERE user_id = 'x'", "id"));
        assert!(!partition_key_has_equality("SELECT * FROM T WHERE idx = 'x'", "id"));
        assert!(partition_key_has_equality(
            "SELECT * FROM T WHERE user_id = 'x' AND id = 'y'",
            "id"
        ));
        assert!(partition_key_has_equality("SELECT * FROM T WHERE t.id='y'", "id"));
        assert!(partition_key_has_equality("SELECT * FROM T WHERE #pk = 1", "#pk"));
    }
}

// =============================================================================
// Rewriting tests
// =============================================================================

mod rewrite_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("sk"), r#""sk""#);
        assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(quote_identifier(""), "");
    }

    #[test]
    fn test_inject_strips_terminator() {
        assert_eq!(
            inject_order_by("  SELECT * FROM T WHERE pk = 1;  ", "sk", SortDirection::Desc),
            Some(r#"SELECT * FROM T WHERE pk = 1 ORDER BY "sk" DESC"#.to_string())
        );
    }

    #[test]
    fn test_inject_requires_where() {
        assert_eq!(inject_order_by("SELECT * FROM T", "sk", SortDirection::Asc), None);
        assert_eq!(inject_order_by("SELECT * FROM T WHERE a = 1", "", SortDirection::Asc), None);
    }

    #[test]
    fn test_inject_keeps_existing_order_by() {
        let statement = "SELECT * FROM T WHERE pk = 1 ORDER BY sk DESC";
        assert_eq!(
            inject_order_by(statement, "sk", SortDirection::Asc),
            Some(statement.to_string())
        );
    }
}

// =============================================================================
// Planning tests
// =============================================================================

mod plan_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_injects_order_by_with_partition_equality() {
        let transport = MockTransport::new().with_table(orders_table());
        let spec = QuerySpec::new(r#"SELECT * FROM "T" WHERE "pk" = 'x'"#).with_scan_index_forward(true);

        let plan = plan_native_order(&transport, &spec).await;

        assert_eq!(
            plan,
            NativeOrderPlan {
                statement: r#"SELECT * FROM "T" WHERE "pk" = 'x' ORDER BY "sk" ASC"#.to_string(),
                native_applied: true,
                fallback_field: Some("sk".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_descending_scan() {
        let transport = MockTransport::new().with_table(orders_table());
        let spec = QuerySpec::new(r#"SELECT * FROM "T" WHERE "pk" = 'x'"#).with_scan_index_forward(false);

        let plan = plan_native_order(&transport, &spec).await;
        assert!(plan.statement.ends_with(r#"ORDER BY "sk" DESC"#));
    }

    #[tokio::test]
    async fn test_range_predicate_falls_back_to_schema_sort_key() {
        let transport = MockTransport::new().with_table(orders_table());
        let statement = r#"SELECT * FROM "T" WHERE "pk" > 'x'"#;
        let spec = QuerySpec::new(statement).with_scan_index_forward(true);

        let plan = plan_native_order(&transport, &spec).await;

        assert_eq!(plan.statement, statement);
        assert!(!plan.native_applied);
        assert_eq!(plan.fallback_field.as_deref(), Some("sk"));
    }

    #[tokio::test]
    async fn test_index_key_schema_is_used() {
        let transport = MockTransport::new().with_table(orders_table());
        let spec = QuerySpec::new(r#"SELECT * FROM "T" INDEX "bystatus" WHERE "status" = 'open'"#)
            .with_scan_index_forward(true);

        let plan = plan_native_order(&transport, &spec).await;

        assert!(plan.native_applied);
        assert!(plan.statement.ends_with(r#"ORDER BY "createdAt" ASC"#));
        assert_eq!(transport.describe_calls.lock().as_slice(), ["T".to_string()]);
    }

    #[tokio::test]
    async fn test_sort_key_mismatch_falls_back_to_requested_key() {
        let transport = MockTransport::new().with_table(orders_table());
        let spec = QuerySpec::new(r#"SELECT * FROM "T" WHERE "pk" = 'x'"#)
            .with_scan_index_forward(true)
            .with_sort_key(" updatedAt ");

        let plan = plan_native_order(&transport, &spec).await;

        assert!(!plan.native_applied);
        assert_eq!(plan.fallback_field.as_deref(), Some("updatedAt"));
    }

    #[tokio::test]
    async fn test_requested_key_matching_case_insensitively() {
        let transport = MockTransport::new().with_table(orders_table());
        let spec = QuerySpec::new(r#"SELECT * FROM "T" WHERE "pk" = 'x'"#)
            .with_scan_index_forward(true)
            .with_sort_key("SK");

        let plan = plan_native_order(&transport, &spec).await;
        assert!(plan.native_applied);
        assert!(plan.statement.ends_with(r#"ORDER BY "sk" ASC"#));
    }

    #[tokio::test]
    async fn test_table_without_sort_key() {
        let transport =
            MockTransport::new().with_table(TableDescription::new("T").with_key(KeySchemaElement::hash("pk")));
        let spec = QuerySpec::new(r#"SELECT * FROM "T" WHERE "pk" = 'x'"#).with_scan_index_forward(true);

        let plan = plan_native_order(&transport, &spec).await;
        assert_eq!(plan, NativeOrderPlan::unchanged(spec.statement.as_str()));
    }

    #[tokio::test]
    async fn test_describe_failure_is_not_an_error() {
        let transport = MockTransport::new();
        let spec = QuerySpec::new(r#"SELECT * FROM "Missing" WHERE "pk" = 'x'"#)
            .with_scan_index_forward(true)
            .with_sort_key("sk");

        let plan = plan_native_order(&transport, &spec).await;
        assert!(!plan.native_applied);
        assert_eq!(plan.fallback_field.as_deref(), Some("sk"));
    }

    #[tokio::test]
    async fn test_existing_order_by_skips_describe() {
        let transport = MockTransport::new().with_table(orders_table());
        let spec = QuerySpec::new(r#"SELECT * FROM "T" WHERE "pk" = 'x' ORDER BY "sk" DESC"#)
            .with_scan_index_forward(true);

        let plan = plan_native_order(&transport, &spec).await;
        assert!(plan.native_applied);
        assert_eq!(plan.statement, spec.statement);
        assert!(transport.describe_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_no_scan_direction_leaves_statement_alone() {
        let transport = MockTransport::new().with_table(orders_table());
        let spec = QuerySpec::new(r#"SELECT * FROM "T" WHERE "pk" = 'x'"#);

        let plan = plan_native_order(&transport, &spec).await;
        assert_eq!(plan, NativeOrderPlan::unchanged(spec.statement.as_str()));
        assert!(transport.describe_calls.lock().is_empty());
    }
}
