//! Catalog reader and constraint resolver.
//!
//! Reads a table's live shape from `information_schema`. The schema and table
//! names are always bound as `$1` and `$2`; nothing read here is cached.

use indexmap::IndexMap;
use shipshape_schema::{Constraint, LiveColumn, PgType, QualifiedName, ReferentialAction, TableState};
use tokio_postgres::Row;

use crate::{Connection, ConnectionExt, Error, Result};

const TABLE_EXISTS_SQL: &str = "\
SELECT EXISTS (
    SELECT 1 FROM information_schema.tables
    WHERE table_schema = $1 AND table_name = $2
)";

const COLUMNS_SQL: &str = "\
SELECT
    column_name::text,
    data_type::text,
    udt_name::text,
    is_nullable = 'YES' AS nullable,
    character_maximum_length::int4,
    numeric_precision::int4,
    numeric_scale::int4,
    datetime_precision::int4
FROM information_schema.columns
WHERE table_schema = $1 AND table_name = $2
ORDER BY ordinal_position";

const PRIMARY_KEY_SQL: &str = "\
SELECT tc.constraint_name::text, kcu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
    ON kcu.constraint_schema = tc.constraint_schema
    AND kcu.constraint_name = tc.constraint_name
    AND kcu.table_schema = tc.table_schema
    AND kcu.table_name = tc.table_name
WHERE tc.constraint_type = 'PRIMARY KEY'
    AND tc.table_schema = $1
    AND tc.table_name = $2
ORDER BY kcu.ordinal_position";

const DEPENDENT_FOREIGN_KEYS_SQL: &str = "\
SELECT
    rc.constraint_name::text,
    fk.table_schema::text,
    fk.table_name::text,
    kcu.column_name::text,
    pk_kcu.column_name::text AS referenced_column,
    rc.update_rule::text,
    rc.delete_rule::text
FROM information_schema.referential_constraints rc
JOIN information_schema.table_constraints pk
    ON pk.constraint_schema = rc.unique_constraint_schema
    AND pk.constraint_name = rc.unique_constraint_name
JOIN information_schema.table_constraints fk
    ON fk.constraint_schema = rc.constraint_schema
    AND fk.constraint_name = rc.constraint_name
JOIN information_schema.key_column_usage kcu
    ON kcu.constraint_schema = fk.constraint_schema
    AND kcu.constraint_name = fk.constraint_name
    AND kcu.table_schema = fk.table_schema
    AND kcu.table_name = fk.table_name
JOIN information_schema.key_column_usage pk_kcu
    ON pk_kcu.constraint_schema = pk.constraint_schema
    AND pk_kcu.constraint_name = pk.constraint_name
    AND pk_kcu.table_schema = pk.table_schema
    AND pk_kcu.table_name = pk.table_name
    AND pk_kcu.ordinal_position = kcu.position_in_unique_constraint
WHERE pk.constraint_type = 'PRIMARY KEY'
    AND pk.table_schema = $1
    AND pk.table_name = $2
ORDER BY fk.table_schema, fk.table_name, rc.constraint_name, kcu.ordinal_position";

fn catalog_error(table: &QualifiedName) -> impl Fn(tokio_postgres::Error) -> Error + '_ {
    move |source| Error::CatalogRead {
        table: table.unquoted(),
        source,
    }
}

/// Whether the table exists.
pub async fn table_exists<C: Connection>(conn: &C, table: &QualifiedName) -> Result<bool> {
    let row = conn
        .traced()
        .query_one(TABLE_EXISTS_SQL, &[&table.schema, &table.name])
        .await
        .map_err(catalog_error(table))?;
    row.try_get(0).map_err(catalog_error(table))
}

/// Live columns in ordinal order. Empty if the table does not exist.
pub async fn list_columns<C: Connection>(
    conn: &C,
    table: &QualifiedName,
) -> Result<Vec<LiveColumn>> {
    let rows = conn
        .traced()
        .query(COLUMNS_SQL, &[&table.schema, &table.name])
        .await
        .map_err(catalog_error(table))?;
    rows.iter()
        .map(|row| live_column(row).map_err(catalog_error(table)))
        .collect()
}

fn live_column(row: &Row) -> Result<LiveColumn, tokio_postgres::Error> {
    let name: String = row.try_get(0)?;
    let data_type: String = row.try_get(1)?;
    let udt_name: String = row.try_get(2)?;
    let nullable: bool = row.try_get(3)?;
    // Enums, domains and arrays report a generic data_type.
    let data_type = match data_type.as_str() {
        "USER-DEFINED" | "ARRAY" => udt_name,
        _ => data_type,
    };
    let sql_type = PgType::from_catalog(
        &data_type,
        row.try_get(4)?,
        row.try_get(5)?,
        row.try_get(6)?,
        row.try_get(7)?,
    );
    Ok(LiveColumn::new(name, sql_type, nullable))
}

/// The table's primary key, if it has one.
pub async fn primary_key<C: Connection>(
    conn: &C,
    table: &QualifiedName,
) -> Result<Option<Constraint>> {
    let rows = conn
        .traced()
        .query(PRIMARY_KEY_SQL, &[&table.schema, &table.name])
        .await
        .map_err(catalog_error(table))?;

    let mut key: Option<Constraint> = None;
    for row in &rows {
        let name: String = row.try_get(0).map_err(catalog_error(table))?;
        let column: String = row.try_get(1).map_err(catalog_error(table))?;
        match &mut key {
            Some(pk) => pk.columns.push(column),
            None => key = Some(Constraint::primary_key(table, name, vec![column])),
        }
    }
    Ok(key)
}

/// Foreign keys anywhere in the database that reference the table's primary
/// key, ordered by owning schema, owning table, then constraint name. Each
/// carries the live types of its referencing columns.
///
/// Empty if the table has no primary key or nothing references it.
pub async fn dependent_foreign_keys<C: Connection>(
    conn: &C,
    table: &QualifiedName,
) -> Result<Vec<Constraint>> {
    let rows = conn
        .traced()
        .query(DEPENDENT_FOREIGN_KEYS_SQL, &[&table.schema, &table.name])
        .await
        .map_err(catalog_error(table))?;

    let mut keys: IndexMap<(String, String, String), Constraint> = IndexMap::new();
    for row in &rows {
        let DependentRow {
            name,
            owner,
            column,
            referenced_column,
            on_update,
            on_delete,
        } = dependent_row(row).map_err(catalog_error(table))?;
        let key = (owner.schema.clone(), owner.name.clone(), name.clone());
        let constraint = keys.entry(key).or_insert_with(|| {
            Constraint::foreign_key(&owner, name, Vec::new(), table.clone(), Vec::new())
                .on_update(on_update)
                .on_delete(on_delete)
        });
        constraint.columns.push(column);
        constraint.referenced_columns.push(referenced_column);
    }

    let mut owners: IndexMap<QualifiedName, Vec<LiveColumn>> = IndexMap::new();
    let mut dependents = Vec::with_capacity(keys.len());
    for fk in keys.into_values() {
        let owner = fk.owner();
        if !owners.contains_key(&owner) {
            let columns = list_columns(conn, &owner).await?;
            owners.insert(owner.clone(), columns);
        }
        let owner_columns = &owners[&owner];
        let types = fk
            .columns
            .iter()
            .map(|name| {
                owner_columns
                    .iter()
                    .find(|c| &c.name == name)
                    .map(|c| c.sql_type.clone())
            })
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default();
        dependents.push(fk.with_column_types(types));
    }
    Ok(dependents)
}

struct DependentRow {
    name: String,
    owner: QualifiedName,
    column: String,
    referenced_column: String,
    on_update: ReferentialAction,
    on_delete: ReferentialAction,
}

fn dependent_row(row: &Row) -> Result<DependentRow, tokio_postgres::Error> {
    let update_rule: String = row.try_get(5)?;
    let delete_rule: String = row.try_get(6)?;
    Ok(DependentRow {
        name: row.try_get(0)?,
        owner: QualifiedName::new(row.try_get::<_, String>(1)?, row.try_get::<_, String>(2)?),
        column: row.try_get(3)?,
        referenced_column: row.try_get(4)?,
        on_update: ReferentialAction::parse(&update_rule).unwrap_or_default(),
        on_delete: ReferentialAction::parse(&delete_rule).unwrap_or_default(),
    })
}

/// Read everything the planner needs about one table.
pub async fn read_table_state<C: Connection>(
    conn: &C,
    table: &QualifiedName,
) -> Result<TableState> {
    if !table_exists(conn, table).await? {
        return Ok(TableState::missing(table.clone()));
    }
    let columns = list_columns(conn, table).await?;
    let primary_key = primary_key(conn, table).await?;
    let dependents = if primary_key.is_some() {
        dependent_foreign_keys(conn, table).await?
    } else {
        Vec::new()
    };
    tracing::debug!(
        table = %table.unquoted(),
        columns = columns.len(),
        primary_key = primary_key.as_ref().map(|pk| pk.name.as_str()),
        dependents = dependents.len(),
        "read table state"
    );
    Ok(TableState {
        table: table.clone(),
        exists: true,
        columns,
        primary_key,
        dependents,
    })
}
