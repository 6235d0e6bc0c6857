//! Tests for core value, schema, frame, and configuration types

use super::*;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

// =============================================================================
// SourceValue tests
// =============================================================================

mod source_value_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wire_json_deserialization() {
        let raw = json!({
            "id": {"S": "abc"},
            "count": {"N": "42"},
            "active": {"BOOL": true},
            "missing": {"NULL": true},
            "blob": {"B": "AQID"},
            "tags": {"SS": ["a", "b"]},
            "meta": {"M": {"nested": {"N": "1.5"}}}
        });

        let row: SourceRow = serde_json::from_value(raw).unwrap();
        assert_eq!(row.get("id"), Some(&SourceValue::S("abc".into())));
        assert_eq!(row.get("count"), Some(&SourceValue::N("42".into())));
        assert_eq!(row.get("active"), Some(&SourceValue::Bool(true)));
        assert_eq!(row.get("missing"), Some(&SourceValue::Null));
        assert_eq!(row.get("blob"), Some(&SourceValue::B(vec![1, 2, 3])));
        assert_eq!(
            row.get("tags"),
            Some(&SourceValue::Ss(vec!["a".into(), "b".into()]))
        );

        // Wire order drives column discovery, so it must survive parsing
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["id", "count", "active", "missing", "blob", "tags", "meta"]
        );
    }

    #[test]
    fn test_wire_json_serialization() {
        let value = SourceValue::M(
            [
                ("flag".to_string(), SourceValue::Bool(false)),
                ("nothing".to_string(), SourceValue::Null),
            ]
            .into_iter()
            .collect(),
        );
        let encoded = serde_json::to_value(&value).unwrap();
        assert_eq!(
            encoded,
            json!({"M": {"flag": {"BOOL": false}, "nothing": {"NULL": true}}})
        );
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let result: std::result::Result<SourceValue, _> =
            serde_json::from_value(json!({"B": "not base64!"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_kind_and_placeholder() {
        assert_eq!(SourceValue::Bool(true).kind().as_str(), "BOOL");
        assert_eq!(SourceValue::Ns(vec![]).kind(), ValueKind::Ns);
        assert_eq!(ValueKind::M.placeholder(), "[M]");
        assert_eq!(ValueKind::Ss.placeholder(), "[SS]");
        assert!(SourceValue::Null.is_null());
    }

    #[test]
    fn test_to_json_numbers() {
        let list = SourceValue::L(vec![
            SourceValue::N("1".into()),
            SourceValue::N("2.5".into()),
            SourceValue::S("x".into()),
        ]);
        assert_eq!(list.to_json().unwrap(), json!([1, 2.5, "x"]));

        let ns = SourceValue::Ns(vec!["10".into(), "-3".into()]);
        assert_eq!(ns.to_json().unwrap(), json!([10, -3]));
    }

    #[test]
    fn test_to_json_binary_as_base64() {
        let value = SourceValue::Bs(vec![vec![1, 2, 3]]);
        assert_eq!(value.to_json().unwrap(), json!(["AQID"]));
    }

    #[test]
    fn test_to_json_rejects_non_finite_numbers() {
        let map = SourceValue::M(
            [("bad".to_string(), SourceValue::N("NaN".into()))]
                .into_iter()
                .collect(),
        );
        assert!(matches!(map.to_json(), Err(DynqError::Decode(_))));

        let garbage = SourceValue::Ns(vec!["abc".into()]);
        assert!(garbage.to_json().is_err());
    }

    #[test]
    fn test_from_json() {
        let value = SourceValue::from_json(&json!({"a": [1, "b", null, true]}));
        let SourceValue::M(map) = value else {
            panic!("expected map");
        };
        assert_eq!(
            map.get("a"),
            Some(&SourceValue::L(vec![
                SourceValue::N("1".into()),
                SourceValue::S("b".into()),
                SourceValue::Null,
                SourceValue::Bool(true),
            ]))
        );
    }

    #[test]
    fn test_row_to_json() {
        let mut row = SourceRow::new();
        row.insert("id".into(), SourceValue::S("u1".into()));
        row.insert("n".into(), SourceValue::N("7".into()));
        let obj = row_to_json(&row).unwrap();
        assert_eq!(serde_json::Value::Object(obj), json!({"id": "u1", "n": 7}));
    }
}

// =============================================================================
// DatetimeFormat tests
// =============================================================================

mod datetime_format_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_hint() {
        assert_eq!(DatetimeFormat::from_hint(""), None);
        assert_eq!(DatetimeFormat::from_hint("1"), Some(DatetimeFormat::UnixSeconds));
        assert_eq!(DatetimeFormat::from_hint("2"), Some(DatetimeFormat::UnixMillis));
        assert_eq!(
            DatetimeFormat::from_hint("%Y-%m-%d"),
            Some(DatetimeFormat::Layout("%Y-%m-%d".into()))
        );
    }

    #[test]
    fn test_parse_date_only_layout() {
        let format = DatetimeFormat::Layout("%Y-%m-%d".into());
        let parsed = format.parse_text("2024-01-15").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_datetime_layout() {
        let format = DatetimeFormat::Layout("%Y-%m-%d %H:%M:%S".into());
        let parsed = format.parse_text("2024-01-15 08:30:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_alias() {
        let format = DatetimeFormat::Layout("RFC3339".into());
        let parsed = format.parse_text("2024-01-15T10:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_mismatch_is_decode_error() {
        let format = DatetimeFormat::Layout("%Y-%m-%d".into());
        assert!(matches!(
            format.parse_text("15/01/2024"),
            Err(DynqError::Decode(_))
        ));
    }

    #[test]
    fn test_interpret_epoch() {
        let seconds = DatetimeFormat::UnixSeconds.interpret_epoch(1_700_000_000).unwrap();
        assert_eq!(seconds.timestamp(), 1_700_000_000);

        let millis = DatetimeFormat::UnixMillis.interpret_epoch(1_700_000_000_123).unwrap();
        assert_eq!(millis.timestamp(), 1_700_000_000);
        assert_eq!(millis.timestamp_subsec_millis(), 123);

        let negative = DatetimeFormat::UnixMillis.interpret_epoch(-1).unwrap();
        assert_eq!(negative.timestamp_millis(), -1);
    }

    #[test]
    fn test_interpret_epoch_with_layout_fails() {
        let err = DatetimeFormat::Layout("%Y".into()).interpret_epoch(5).unwrap_err();
        assert_eq!(err.to_string(), "invalid datetime format");
    }
}

// =============================================================================
// QuerySpec tests
// =============================================================================

mod query_spec_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_host_json() {
        let raw = br#"{
            "queryText": "SELECT * FROM \"orders\"",
            "limit": 25,
            "datetimeAttributes": [{"name": "createdAt", "format": "2"}],
            "sortBy": "total",
            "sortDirection": "desc",
            "sortKey": " createdAt ",
            "scanIndexForward": false
        }"#;

        let spec = QuerySpec::from_json(raw).unwrap();
        assert_eq!(spec.statement, "SELECT * FROM \"orders\"");
        assert_eq!(spec.limit, Some(25));
        assert_eq!(spec.explicit_sort_field(), Some("total"));
        assert_eq!(spec.sort_direction, SortDirection::Desc);
        assert_eq!(spec.requested_sort_key(), Some("createdAt"));
        assert_eq!(spec.scan_index_forward, Some(false));
        assert_eq!(
            spec.datetime_hints().get("createdAt"),
            Some(&DatetimeFormat::UnixMillis)
        );
    }

    #[test]
    fn test_non_positive_limit_is_unbounded() {
        let spec = QuerySpec::from_json(br#"{"queryText": "x", "limit": 0}"#).unwrap();
        assert_eq!(spec.limit, None);
        let spec = QuerySpec::from_json(br#"{"queryText": "x", "limit": -5}"#).unwrap();
        assert_eq!(spec.limit, None);
    }

    #[test]
    fn test_unknown_direction_is_ascending() {
        let spec = QuerySpec::from_json(br#"{"queryText": "x", "sortDirection": "DESC"}"#).unwrap();
        assert_eq!(spec.sort_direction, SortDirection::Asc);
    }

    #[test]
    fn test_malformed_json_is_validation_error() {
        let err = QuerySpec::from_json(b"{not json").unwrap_err();
        assert_eq!(err.status(), ErrorStatus::BadRequest);
        assert!(err.to_string().starts_with("json unmarshal:"));
    }

    #[test]
    fn test_blank_sort_fields_are_ignored() {
        let spec = QuerySpec::new("x").with_sort_key("   ");
        assert_eq!(spec.requested_sort_key(), None);
        assert_eq!(spec.explicit_sort_field(), None);
    }

    #[test]
    fn test_empty_hint_clears_earlier_entry() {
        let spec = QuerySpec::new("x")
            .with_datetime_attribute("ts", "1")
            .with_datetime_attribute("ts", "");
        assert!(spec.datetime_hints().is_empty());
    }
}

// =============================================================================
// Key schema tests
// =============================================================================

mod schema_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn orders_table() -> TableDescription {
        TableDescription::new("orders")
            .with_key(KeySchemaElement::hash("pk"))
            .with_key(KeySchemaElement::range("sk"))
            .with_global_index(IndexDescription::new(
                "ByCustomer",
                vec![
                    KeySchemaElement::hash("customer"),
                    KeySchemaElement::range("createdAt"),
                ],
            ))
            .with_local_index(IndexDescription::new(
                "ByStatus",
                vec![KeySchemaElement::hash("pk"), KeySchemaElement::range("status")],
            ))
    }

    #[test]
    fn test_table_key_schema() {
        let schema = orders_table().key_schema_for(None).unwrap();
        assert_eq!(schema.partition_key.as_deref(), Some("pk"));
        assert_eq!(schema.sort_key.as_deref(), Some("sk"));
    }

    #[test]
    fn test_index_lookup_is_case_insensitive() {
        let table = orders_table();
        let gsi = table.key_schema_for(Some("bycustomer")).unwrap();
        assert_eq!(gsi.sort_key.as_deref(), Some("createdAt"));
        let lsi = table.key_schema_for(Some("BYSTATUS")).unwrap();
        assert_eq!(lsi.sort_key.as_deref(), Some("status"));
    }

    #[test]
    fn test_unknown_index_is_error() {
        let err = orders_table().key_schema_for(Some("Missing")).unwrap_err();
        assert_eq!(err.to_string(), "Not found: index Missing not found on table orders");
    }

    #[test]
    fn test_index_lookup_without_indexes() {
        let table = TableDescription::new("bare").with_key(KeySchemaElement::hash("pk"));
        let err = table.key_schema_for(Some("byDate")).unwrap_err();
        assert_eq!(err.status(), ErrorStatus::NotFound);

        let schema = table.key_schema_for(Some("")).unwrap();
        assert_eq!(schema.partition_key.as_deref(), Some("pk"));
    }

    #[test]
    fn test_describe_output_deserialization() {
        let raw = json!({
            "TableName": "events",
            "KeySchema": [
                {"AttributeName": "device", "KeyType": "HASH"},
                {"AttributeName": "ts", "KeyType": "RANGE"}
            ],
            "AttributeDefinitions": [{"AttributeName": "device", "AttributeType": "S"}]
        });
        let table: TableDescription = serde_json::from_value(raw).unwrap();
        assert_eq!(table.key_schema[1].key_type, KeyType::Range);
        assert_eq!(table.attribute_definitions.len(), 1);
        assert!(table.global_secondary_indexes.is_empty());
    }
}

// =============================================================================
// Frame model tests
// =============================================================================

mod frame_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_starting_with_pads_nulls() {
        let data = ColumnData::starting_with(Cell::Int64(9), 2);
        assert_eq!(data, ColumnData::Int64(vec![None, None, Some(9)]));
        assert_eq!(data.column_type(), ColumnType::Int64);
        assert!(data.is_null(0));
        assert_eq!(data.cell(2), Some(Cell::Int64(9)));
        assert_eq!(data.cell(3), None);
    }

    #[test]
    fn test_frame_accessors() {
        let frame = Frame {
            name: "A".into(),
            columns: vec![Column {
                name: "id".into(),
                datetime_format: None,
                data: ColumnData::String(vec![Some("a".into()), None]),
            }],
            row_count: 2,
            diagnostics: Vec::new(),
        };
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.column_names(), vec!["id"]);
        assert!(frame.column("missing").is_none());
        assert!(Frame::new("B").is_empty());
        assert_eq!(Frame::new("B").row_count(), 0);
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = FrameDiagnostic::ConvertedToString {
            column: "v".into(),
            from: ColumnType::Int64,
            row: 3,
        };
        assert_eq!(diag.to_string(), "column v converted from int64 to string at row 3");
        assert_eq!(diag.column(), "v");
    }
}

// =============================================================================
// Configuration and error tests
// =============================================================================

mod config_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_collector_limit_defaults() {
        let limits = CollectorLimits::default();
        assert_eq!(limits.max_pages(), 1000);
        assert_eq!(limits.max_items(), 1_000_000);
        assert_eq!(limits.max_duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_collector_limit_builders() {
        let limits = CollectorLimits::default()
            .with_max_pages(3)
            .with_max_items(10)
            .with_max_duration_ms(500);
        assert_eq!(limits, CollectorLimits::new(3, 10, 500));
    }

    #[test]
    fn test_engine_config_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            connectionTestTable = "health"

            [collector]
            maxPages = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.connection_test_table(), "health");
        assert_eq!(config.collector_limits().max_pages(), 5);
        assert_eq!(config.collector_limits().max_items(), 1_000_000);
    }

    #[test]
    fn test_engine_config_from_json() {
        let config = EngineConfig::from_json_str(r#"{"connectionTestTable": "t"}"#).unwrap();
        assert_eq!(config.connection_test_table(), "t");
        assert_eq!(config.collector_limits(), &CollectorLimits::default());

        let err = EngineConfig::from_json_str("[").unwrap_err();
        assert_eq!(err.status(), ErrorStatus::Internal);
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(DynqError::Forbidden("x".into()).status().code(), 403);
        assert_eq!(DynqError::NotFound("x".into()).status().code(), 404);
        assert_eq!(DynqError::Timeout("x".into()).status(), ErrorStatus::BadRequest);

        let wrapped = DynqError::Validation("payload is empty".into()).context("item 2");
        assert_eq!(wrapped.to_string(), "item 2: payload is empty");

        let response = ErrorResponse::from(DynqError::Cancelled("context canceled".into()));
        assert_eq!(response.message, "query cancelled: context canceled");
        assert_eq!(response.status, ErrorStatus::BadRequest);
    }
}
