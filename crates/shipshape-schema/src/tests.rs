use super::*;
use proptest::prelude::*;

#[test]
fn test_from_name_rust_spellings() {
    assert_eq!(LogicalType::from_name("i16"), Some(LogicalType::Int16));
    assert_eq!(LogicalType::from_name("i32"), Some(LogicalType::Int32));
    assert_eq!(LogicalType::from_name("i64"), Some(LogicalType::Int64));
    assert_eq!(LogicalType::from_name("f32"), Some(LogicalType::Float32));
    assert_eq!(LogicalType::from_name("f64"), Some(LogicalType::Float64));
    assert_eq!(LogicalType::from_name("String"), Some(LogicalType::Text));
    assert_eq!(LogicalType::from_name("bool"), Some(LogicalType::Boolean));
    assert_eq!(LogicalType::from_name("Uuid"), Some(LogicalType::Uuid));
    assert_eq!(
        LogicalType::from_name("DateTime<Utc>"),
        Some(LogicalType::TimestampTz)
    );
}

#[test]
fn test_from_name_sql_spellings() {
    assert_eq!(LogicalType::from_name("BIGINT"), Some(LogicalType::Int64));
    assert_eq!(
        LogicalType::from_name("double  precision"),
        Some(LogicalType::Float64)
    );
    assert_eq!(
        LogicalType::from_name("timestamp with time zone"),
        Some(LogicalType::TimestampTz)
    );
    assert_eq!(
        LogicalType::from_name("timestamp"),
        Some(LogicalType::Timestamp)
    );
    assert_eq!(
        LogicalType::from_name("varchar(255)"),
        Some(LogicalType::VarChar(Some(255)))
    );
    assert_eq!(
        LogicalType::from_name("character varying"),
        Some(LogicalType::VarChar(None))
    );
}

#[test]
fn test_from_name_decimal() {
    assert_eq!(
        LogicalType::from_name("decimal"),
        Some(LogicalType::Decimal(None))
    );
    assert_eq!(
        LogicalType::from_name("numeric(18, 2)"),
        Some(LogicalType::Decimal(Some((18, 2))))
    );
    assert_eq!(
        LogicalType::from_name("NUMERIC(10)"),
        Some(LogicalType::Decimal(Some((10, 0))))
    );
}

#[test]
fn test_from_name_rejects_unsupported() {
    assert_eq!(LogicalType::from_name("geometry"), None);
    assert_eq!(LogicalType::from_name("jsonb"), None);
    assert_eq!(LogicalType::from_name(""), None);
    assert_eq!(LogicalType::from_name("i64(3)"), None);
    assert_eq!(LogicalType::from_name("varchar(0)"), None);
    assert_eq!(LogicalType::from_name("varchar(abc)"), None);
    assert_eq!(LogicalType::from_name("numeric(5, 6)"), None);
    assert_eq!(LogicalType::from_name("numeric(0)"), None);
    assert_eq!(LogicalType::from_name("numeric(18,2"), None);
}

#[test]
fn test_column_type_sql() {
    assert_eq!(column_type_sql(LogicalType::Int64, false), "BIGINT NOT NULL");
    assert_eq!(column_type_sql(LogicalType::Text, true), "TEXT NULL");
    assert_eq!(
        column_type_sql(LogicalType::Decimal(Some((18, 2))), false),
        "NUMERIC(18,2) NOT NULL"
    );
    assert_eq!(
        column_type_sql(LogicalType::VarChar(Some(40)), true),
        "VARCHAR(40) NULL"
    );
    assert_eq!(
        column_type_sql(LogicalType::TimestampTz, false),
        "TIMESTAMPTZ NOT NULL"
    );
}

#[test]
fn test_from_catalog_normalizes_spellings() {
    assert_eq!(
        PgType::from_catalog("character varying", Some(255), None, None, None),
        PgType::VarChar(Some(255))
    );
    assert_eq!(
        PgType::from_catalog("timestamp without time zone", None, None, None, None),
        PgType::Timestamp
    );
    assert_eq!(
        PgType::from_catalog("timestamp with time zone", None, None, None, None),
        PgType::Timestamptz
    );
    assert_eq!(
        PgType::from_catalog("numeric", None, Some(18), Some(2), None),
        PgType::Numeric(Some((18, 2)))
    );
    assert_eq!(
        PgType::from_catalog("numeric", None, None, None, None),
        PgType::Numeric(None)
    );
    assert_eq!(
        PgType::from_catalog("jsonb", None, None, None, None),
        PgType::Other("JSONB".to_string())
    );
}

#[test]
fn test_from_catalog_keeps_timestamp_precision() {
    assert_eq!(
        PgType::from_catalog("timestamp without time zone", None, None, None, Some(6)),
        PgType::Timestamp
    );
    let truncated = PgType::from_catalog("timestamp without time zone", None, None, None, Some(0));
    assert_eq!(truncated, PgType::Other("TIMESTAMP(0)".to_string()));
    assert_ne!(truncated, map_type(LogicalType::Timestamp));
    assert_eq!(
        PgType::from_catalog("timestamp with time zone", None, None, None, Some(3)).to_string(),
        "TIMESTAMPTZ(3)"
    );
}

#[test]
fn test_lossless_conversions() {
    assert!(PgType::Integer.converts_losslessly_to(&PgType::BigInt));
    assert!(PgType::VarChar(Some(10)).converts_losslessly_to(&PgType::VarChar(Some(20))));
    assert!(PgType::VarChar(Some(10)).converts_losslessly_to(&PgType::Text));
    assert!(
        PgType::Numeric(Some((10, 2))).converts_losslessly_to(&PgType::Numeric(Some((12, 4))))
    );

    assert!(!PgType::BigInt.converts_losslessly_to(&PgType::Integer));
    assert!(!PgType::VarChar(Some(10)).converts_losslessly_to(&PgType::VarChar(Some(3))));
    assert!(!PgType::Text.converts_losslessly_to(&PgType::VarChar(Some(255))));
    assert!(
        !PgType::Numeric(Some((18, 4))).converts_losslessly_to(&PgType::Numeric(Some((18, 2))))
    );
    assert!(!PgType::Text.converts_losslessly_to(&PgType::Integer));
}

#[test]
fn test_out_of_range_logical_types_are_unsupported() {
    let model = TableModel::new("orders")
        .column(ColumnDecl::new("id", LogicalType::Int64).primary_key())
        .column(ColumnDecl::new("code", LogicalType::VarChar(Some(0))));
    let err = model.descriptors().unwrap_err();
    assert!(err.is_unsupported_type());
    assert_eq!(
        err.to_string(),
        "unsupported type `VarChar(Some(0))` for column `code` of table `orders`"
    );

    for ty in [
        LogicalType::Decimal(Some((0, 5))),
        LogicalType::Decimal(Some((4, 5))),
        LogicalType::Decimal(Some((1001, 2))),
        LogicalType::VarChar(Some(10_485_761)),
    ] {
        let model = TableModel::new("orders").column(ColumnDecl::new("amount", ty));
        assert!(
            model.descriptors().unwrap_err().is_unsupported_type(),
            "{:?} accepted",
            ty
        );
    }
}

#[test]
fn test_descriptors_in_declaration_order() {
    let model = TableModel::new("orders")
        .column(ColumnDecl::new("id", LogicalType::Int64).primary_key())
        .column(ColumnDecl::new("note", "text").nullable())
        .column(ColumnDecl::new("total", "numeric(18,2)"));

    let descriptors = model.descriptors().unwrap();
    let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["id", "note", "total"]);
    assert_eq!(descriptors[0].column_sql(), "BIGINT NOT NULL");
    assert_eq!(descriptors[1].column_sql(), "TEXT NULL");
    assert_eq!(descriptors[2].sql_type, PgType::Numeric(Some((18, 2))));
    assert!(descriptors[0].primary_key);
}

#[test]
fn test_descriptors_empty_model() {
    let err = TableModel::new("orders").descriptors().unwrap_err();
    assert_eq!(
        err,
        ModelError::NoColumns {
            table: "orders".to_string()
        }
    );
}

#[test]
fn test_descriptors_duplicate_column() {
    let err = TableModel::new("orders")
        .column(ColumnDecl::new("id", "i64"))
        .column(ColumnDecl::new("id", "text"))
        .descriptors()
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateColumn { column, .. } if column == "id"));
}

#[test]
fn test_descriptors_multiple_primary_keys() {
    let err = TableModel::new("orders")
        .column(ColumnDecl::new("a", "i64").primary_key())
        .column(ColumnDecl::new("b", "i64").primary_key())
        .descriptors()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "table `orders` declares more than one primary key column: a, b"
    );
}

#[test]
fn test_descriptors_nullable_primary_key() {
    let err = TableModel::new("orders")
        .column(ColumnDecl::new("id", "i64").primary_key().nullable())
        .descriptors()
        .unwrap_err();
    assert!(matches!(err, ModelError::NullablePrimaryKey { .. }));
}

#[test]
fn test_descriptors_unsupported_type() {
    let err = TableModel::new("orders")
        .column(ColumnDecl::new("id", "i64").primary_key())
        .column(ColumnDecl::new("shape", "geometry"))
        .descriptors()
        .unwrap_err();
    assert!(err.is_unsupported_type());
    assert_eq!(
        err.to_string(),
        "unsupported type `geometry` for column `shape` of table `orders`"
    );
}

#[test]
fn test_descriptors_invalid_identifiers() {
    let err = TableModel::new("")
        .column(ColumnDecl::new("id", "i64"))
        .descriptors()
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidTableName { .. }));

    let err = TableModel::new("orders")
        .column(ColumnDecl::new("bad\0name", "i64"))
        .descriptors()
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidColumnName { .. }));
}

#[test]
fn test_entity_def_to_model() {
    static COLUMNS: &[StaticColumn] = &[
        StaticColumn::new("id", "i64").primary_key(),
        StaticColumn::new("bio", "text").nullable(),
    ];
    let def = EntityDef::new("users", COLUMNS);
    let model = def.to_model();
    assert_eq!(model.name, "users");
    assert_eq!(
        model.columns,
        vec![
            ColumnDecl::new("id", "i64").primary_key(),
            ColumnDecl::new("bio", "text").nullable(),
        ]
    );
}

#[test]
fn test_self_reference() {
    let users = QualifiedName::new("public", "users");
    let fk = Constraint::foreign_key(
        &users,
        "users_manager_id_fkey",
        vec!["manager_id".to_string()],
        users.clone(),
        vec!["id".to_string()],
    );
    assert!(fk.is_self_reference());

    let orders = QualifiedName::new("public", "orders");
    let fk = Constraint::foreign_key(
        &orders,
        "orders_user_id_fkey",
        vec!["user_id".to_string()],
        users,
        vec!["id".to_string()],
    );
    assert!(!fk.is_self_reference());
}

/// How `information_schema.columns` reports a type we created.
#[allow(clippy::type_complexity)]
fn catalog_view(
    ty: &PgType,
) -> (&'static str, Option<i32>, Option<i32>, Option<i32>, Option<i32>) {
    let (data_type, len, precision, scale) = match ty {
        PgType::SmallInt => ("smallint", None, Some(16), Some(0)),
        PgType::Integer => ("integer", None, Some(32), Some(0)),
        PgType::BigInt => ("bigint", None, Some(64), Some(0)),
        PgType::Real => ("real", None, Some(24), None),
        PgType::DoublePrecision => ("double precision", None, Some(53), None),
        PgType::Numeric(None) => ("numeric", None, None, None),
        PgType::Numeric(Some((p, s))) => ("numeric", None, Some(*p as i32), Some(*s as i32)),
        PgType::Text => ("text", None, None, None),
        PgType::VarChar(len) => ("character varying", len.map(|l| l as i32), None, None),
        PgType::Boolean => ("boolean", None, None, None),
        PgType::Timestamp => ("timestamp without time zone", None, None, None),
        PgType::Timestamptz => ("timestamp with time zone", None, None, None),
        PgType::Uuid => ("uuid", None, None, None),
        PgType::Other(_) => unreachable!("never produced by map_type"),
    };
    let datetime = matches!(ty, PgType::Timestamp | PgType::Timestamptz).then_some(6);
    (data_type, len, precision, scale, datetime)
}

fn any_logical_type() -> impl Strategy<Value = LogicalType> {
    prop_oneof![
        Just(LogicalType::Int16),
        Just(LogicalType::Int32),
        Just(LogicalType::Int64),
        Just(LogicalType::Float32),
        Just(LogicalType::Float64),
        Just(LogicalType::Text),
        Just(LogicalType::Boolean),
        Just(LogicalType::Timestamp),
        Just(LogicalType::TimestampTz),
        Just(LogicalType::Uuid),
        Just(LogicalType::Decimal(None)),
        (1u16..=1000)
            .prop_flat_map(|p| (Just(p), 0..=p))
            .prop_map(|(p, s)| LogicalType::Decimal(Some((p, s)))),
        proptest::option::of(1u32..=10_485_760).prop_map(LogicalType::VarChar),
    ]
}

proptest! {
    #[test]
    fn test_mapped_type_matches_catalog(ty in any_logical_type()) {
        let mapped = map_type(ty);
        let (data_type, len, precision, scale, datetime) = catalog_view(&mapped);
        prop_assert_eq!(PgType::from_catalog(data_type, len, precision, scale, datetime), mapped);
    }

    #[test]
    fn test_display_parses_back(ty in any_logical_type()) {
        let rendered = map_type(ty).to_string();
        prop_assert_eq!(LogicalType::from_name(&rendered), Some(ty));
    }
}
