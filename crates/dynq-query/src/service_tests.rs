//! Tests for the query service

use std::sync::Arc;

use super::*;
use crate::mock_transport::{MockTransport, Scripted, n, numbered_rows, row, s};
use dynq_core::{
    CollectorLimits, ColumnData, ColumnType, DynqError, EngineConfig, ErrorStatus,
    KeySchemaElement, QuerySpec, SortDirection, StatementPage, TableDescription,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn service(transport: MockTransport) -> (QueryService, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let service = QueryService::new(transport.clone(), EngineConfig::default());
    (service, transport)
}

fn events_table() -> TableDescription {
    TableDescription::new("T")
        .with_key(KeySchemaElement::hash("pk"))
        .with_key(KeySchemaElement::range("sk"))
}

// =============================================================================
// Query tests
// =============================================================================

mod query_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_empty_statement_is_rejected() {
        let (service, transport) = service(MockTransport::new());
        let err = service
            .query(&QuerySpec::new("   "), "A", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DynqError::Validation(_)));
        assert_eq!(err.to_string(), "query text cannot be empty");
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_result_is_named_empty_frame() {
        let (service, _) = service(MockTransport::new());
        let outcome = service
            .query(&QuerySpec::new(r#"SELECT * FROM "T""#), "A", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.frame.name, "A");
        assert!(outcome.frame.columns.is_empty());
        assert_eq!(outcome.sort, None);
    }

    #[tokio::test]
    async fn test_limit_is_applied_after_sorting() {
        let (service, transport) = service(MockTransport::paged(numbered_rows(30), 3));
        let spec = QuerySpec::new(r#"SELECT * FROM "T""#)
            .with_limit(7)
            .with_sort_by("id", SortDirection::Desc);

        let outcome = service.query(&spec, "A", &CancellationToken::new()).await.unwrap();

        assert_eq!(transport.call_count(), 3);
        assert_eq!(outcome.pages, 3);
        assert_eq!(outcome.frame.row_count(), 7);
        assert_eq!(
            outcome.frame.column("id").unwrap().data,
            ColumnData::Int64((2..=8).rev().map(Some).collect())
        );
    }

    #[tokio::test]
    async fn test_native_order_is_injected() {
        let items = vec![
            row(&[("pk", s("x")), ("sk", s("a"))]),
            row(&[("pk", s("x")), ("sk", s("b"))]),
        ];
        let (service, transport) = service(
            MockTransport::new()
                .with_table(events_table())
                .with_script(vec![Scripted::Page(StatementPage::new(items))]),
        );
        let spec = QuerySpec::new(r#"SELECT * FROM "T" WHERE "pk" = 'x'"#).with_scan_index_forward(true);

        let outcome = service.query(&spec, "A", &CancellationToken::new()).await.unwrap();

        assert!(outcome.native_order_applied);
        assert_eq!(outcome.sort, None);
        assert_eq!(
            transport.statements(),
            vec![r#"SELECT * FROM "T" WHERE "pk" = 'x' ORDER BY "sk" ASC"#.to_string()]
        );
    }

    #[tokio::test]
    async fn test_declined_native_order_sorts_client_side() {
        let items = vec![
            row(&[("pk", s("y")), ("sk", s("c"))]),
            row(&[("pk", s("z")), ("sk", s("a"))]),
            row(&[("pk", s("y")), ("sk", s("b"))]),
        ];
        let (service, transport) = service(
            MockTransport::new()
                .with_table(events_table())
                .with_script(vec![Scripted::Page(StatementPage::new(items))]),
        );
        let statement = r#"SELECT * FROM "T" WHERE "pk" > 'x'"#;
        let spec = QuerySpec::new(statement).with_scan_index_forward(false);

        let outcome = service.query(&spec, "A", &CancellationToken::new()).await.unwrap();

        assert_eq!(transport.statements(), vec![statement.to_string()]);
        assert!(!outcome.native_order_applied);
        assert_eq!(outcome.sort.as_ref().map(|s| s.field.as_str()), Some("sk"));
        assert_eq!(
            outcome.frame.column("sk").unwrap().data,
            ColumnData::String(vec![Some("c".into()), Some("b".into()), Some("a".into())])
        );
    }

    #[tokio::test]
    async fn test_heuristic_sort_when_schema_unavailable() {
        let items = vec![
            row(&[("id", s("1")), ("timestamp", n("100"))]),
            row(&[("id", s("2")), ("timestamp", n("300"))]),
            row(&[("id", s("3")), ("timestamp", n("200"))]),
        ];
        let (service, _) = service(
            MockTransport::new().with_script(vec![Scripted::Page(StatementPage::new(items))]),
        );
        let spec = QuerySpec::new(r#"SELECT * FROM "Unknown" WHERE "id" = '1'"#).with_scan_index_forward(false);

        let outcome = service.query(&spec, "A", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.sort.as_ref().map(|s| s.field.as_str()), Some("timestamp"));
        assert_eq!(
            outcome.frame.column("id").unwrap().data,
            ColumnData::String(vec![Some("2".into()), Some("3".into()), Some("1".into())])
        );
    }

    #[tokio::test]
    async fn test_datetime_hints_shape_columns() {
        let items = vec![row(&[("ts", n("1700000000")), ("count", n("4"))])];
        let (service, _) = service(
            MockTransport::new().with_script(vec![Scripted::Page(StatementPage::new(items))]),
        );
        let spec = QuerySpec::new(r#"SELECT * FROM "T""#).with_datetime_attribute("ts", "1");

        let outcome = service.query(&spec, "A", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.frame.column("ts").unwrap().column_type(), ColumnType::Time);
        assert_eq!(outcome.frame.column("count").unwrap().column_type(), ColumnType::Int64);
    }

    #[tokio::test]
    async fn test_partial_outcome_is_flagged() {
        let transport = MockTransport::paged(numbered_rows(10), 3);
        let transport = Arc::new(transport);
        let config = EngineConfig::default()
            .with_collector_limits(CollectorLimits::default().with_max_pages(1));
        let service = QueryService::new(transport, config);

        let outcome = service
            .query(&QuerySpec::new(r#"SELECT * FROM "T""#), "A", &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.is_partial());
        assert_eq!(outcome.frame.row_count(), 3);
    }
}

// =============================================================================
// Batch tests
// =============================================================================

mod batch_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_each_query_gets_its_own_response() {
        let (service, _) = service(MockTransport::new().with_script(vec![
            Scripted::Page(StatementPage::new(numbered_rows(2))),
            Scripted::Fail("boom".into()),
        ]));
        let queries = vec![
            DataQuery::new("A", r#"{"queryText": "SELECT * FROM \"T\""}"#),
            DataQuery::new("B", r#"{"queryText": "SELECT * FROM \"U\""}"#),
            DataQuery::new("C", "not json"),
            DataQuery::new("D", r#"{"queryText": ""}"#),
        ];

        let responses = service.query_data(&queries, &CancellationToken::new()).await;

        assert_eq!(responses.keys().collect::<Vec<_>>(), vec!["A", "B", "C", "D"]);

        let a = &responses["A"];
        assert!(a.error.is_none());
        assert_eq!(a.frames.len(), 1);
        assert_eq!(a.frames[0].row_count(), 2);

        let b = responses["B"].error.as_ref().unwrap();
        assert_eq!(b.status, ErrorStatus::BadRequest);
        assert_eq!(b.message, "executes statement: boom");

        let c = responses["C"].error.as_ref().unwrap();
        assert_eq!(c.status, ErrorStatus::BadRequest);
        assert!(c.message.starts_with("json unmarshal: "));

        let d = responses["D"].error.as_ref().unwrap();
        assert_eq!(d.message, "query text cannot be empty");
    }

    #[tokio::test]
    async fn test_cancelled_batch_reports_cancellation() {
        let (service, _) = service(MockTransport::paged(numbered_rows(3), 3));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let responses = service
            .query_data(&[DataQuery::new("A", r#"{"queryText": "SELECT * FROM T"}"#)], &cancel)
            .await;

        let error = responses["A"].error.as_ref().unwrap();
        assert_eq!(error.message, "query cancelled: context canceled");
    }
}

// =============================================================================
// Metadata tests
// =============================================================================

mod metadata_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_health_uses_configured_table() {
        let transport = Arc::new(MockTransport::new().with_table(TableDescription::new("probe")));
        let service = QueryService::new(
            transport.clone(),
            EngineConfig::default().with_connection_test_table("probe"),
        );

        assert!(service.check_health().await.is_ok());
        assert_eq!(transport.describe_calls.lock().as_slice(), ["probe".to_string()]);
    }

    #[tokio::test]
    async fn test_table_attributes_delegates() {
        let (service, _) = service(MockTransport::new().with_table(events_table()));
        assert_eq!(service.table_attributes("T").await.unwrap(), vec!["pk", "sk"]);
    }
}
