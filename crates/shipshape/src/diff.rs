//! Table diffing - compare a declared model against a live table.
//!
//! [`plan_table`] turns a [`TableState`] and a declared column set into a
//! [`MigrationPlan`]: an ordered list of [`Change`]s where every statement can
//! run as soon as the ones before it have.
//!
//! ## Emission order
//!
//! ```text
//! + table                  (only if the table is missing)
//! - FOREIGN KEY ...        dependents of the primary key, catalog order
//! - PRIMARY KEY ...
//! + column                 declared order
//! ~ column                 declared order
//! - column                 live order
//! + PRIMARY KEY ...
//! + FOREIGN KEY ...        same order they were dropped in
//! ```
//!
//! The primary key (and with it, every foreign key pointing at it) is only
//! rebuilt when it has to be: the key moves to another column, the key column
//! is added or altered, or the model no longer declares a key. A table that
//! already matches its model yields an empty plan.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use shipshape_schema::{
    ColumnDescriptor, Constraint, LiveColumn, PgType, QualifiedName, TableState,
};
use shipshape_sql::{AlterAction, DdlStmt, ForeignKeyDef, primary_key_name, render_all};

use crate::{Error, Result};

/// What to do with live columns the model does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropColumns {
    /// Drop them. The model is the whole truth about the table.
    #[default]
    Drop,
    /// Leave them in place.
    Keep,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOptions {
    pub drop_columns: DropColumns,
}

/// A single schema change on one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Create the table with no columns.
    CreateTable,
    /// Drop a foreign key that references this table's primary key.
    DropForeignKey(Constraint),
    /// Drop the primary key.
    DropPrimaryKey(Constraint),
    AddColumn(ColumnDescriptor),
    /// Change a column's type, nullability, or both.
    AlterColumn {
        from: LiveColumn,
        to: ColumnDescriptor,
    },
    DropColumn(LiveColumn),
    AddPrimaryKey { name: String, column: String },
    /// Recreate a previously dropped foreign key.
    AddForeignKey(ForeignKeyDef),
}

impl Change {
    /// The statement for this change on `table`.
    pub fn to_stmt(&self, table: &QualifiedName) -> DdlStmt {
        match self {
            Change::CreateTable => DdlStmt::CreateTable {
                table: table.clone(),
            },
            Change::DropForeignKey(fk) => DdlStmt::DropConstraint {
                table: fk.owner(),
                name: fk.name.clone(),
            },
            Change::DropPrimaryKey(pk) => DdlStmt::DropConstraint {
                table: table.clone(),
                name: pk.name.clone(),
            },
            Change::AddColumn(col) => DdlStmt::AddColumn {
                table: table.clone(),
                column: col.name.clone(),
                sql_type: col.sql_type.to_string(),
                nullable: col.nullable,
            },
            Change::AlterColumn { from, to } => {
                let mut actions = Vec::new();
                if from.sql_type != to.sql_type {
                    actions.push(AlterAction::SetType(to.sql_type.to_string()));
                }
                match (from.nullable, to.nullable) {
                    (true, false) => actions.push(AlterAction::SetNotNull),
                    (false, true) => actions.push(AlterAction::DropNotNull),
                    _ => {}
                }
                DdlStmt::AlterColumn {
                    table: table.clone(),
                    column: to.name.clone(),
                    actions,
                }
            }
            Change::DropColumn(col) => DdlStmt::DropColumn {
                table: table.clone(),
                column: col.name.clone(),
            },
            Change::AddPrimaryKey { name, column } => DdlStmt::AddPrimaryKey {
                table: table.clone(),
                name: name.clone(),
                columns: vec![column.clone()],
            },
            Change::AddForeignKey(fk) => DdlStmt::AddForeignKey(fk.clone()),
        }
    }

    /// Whether this change can lose data: a dropped column, or a type change
    /// that can truncate, round or reject existing values.
    pub fn is_destructive(&self) -> bool {
        match self {
            Change::DropColumn(_) => true,
            Change::AlterColumn { from, to } => {
                !from.sql_type.converts_losslessly_to(&to.sql_type)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::CreateTable => write!(f, "+ table"),
            Change::DropForeignKey(fk) => write!(
                f,
                "- FOREIGN KEY {} on {}.{} ({})",
                fk.name,
                fk.owner_schema,
                fk.owner_table,
                fk.columns.join(", ")
            ),
            Change::DropPrimaryKey(pk) => {
                write!(f, "- PRIMARY KEY {} ({})", pk.name, pk.columns.join(", "))
            }
            Change::AddColumn(col) => write!(f, "+ {}: {}", col.name, col.column_sql()),
            Change::AlterColumn { from, to } => {
                write!(f, "~ {}: {} -> {}", to.name, from.column_sql(), to.column_sql())
            }
            Change::DropColumn(col) => write!(f, "- {}: {}", col.name, col.column_sql()),
            Change::AddPrimaryKey { name, column } => {
                write!(f, "+ PRIMARY KEY {} ({})", name, column)
            }
            Change::AddForeignKey(fk) => write!(
                f,
                "+ FOREIGN KEY {} on {}.{} ({}) -> {}.{} ({})",
                fk.name,
                fk.table.schema,
                fk.table.name,
                fk.columns.join(", "),
                fk.references.schema,
                fk.references.name,
                fk.referenced_columns.join(", ")
            ),
        }
    }
}

/// The ordered changes that bring one table in line with its model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub table: QualifiedName,
    pub changes: Vec<Change>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn stmts(&self) -> Vec<DdlStmt> {
        self.changes.iter().map(|c| c.to_stmt(&self.table)).collect()
    }

    /// The plan as SQL, one statement per entry, in execution order.
    pub fn statements(&self) -> Vec<String> {
        render_all(&self.stmts())
    }

    /// All statements joined into a script.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("-- Table: {}.{}\n", self.table.schema, self.table.name);
        for stmt in self.statements() {
            sql.push_str(&stmt);
            sql.push('\n');
        }
        sql
    }
}

impl fmt::Display for MigrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "{}.{}: up to date", self.table.schema, self.table.name);
        }
        writeln!(f, "{}.{}:", self.table.schema, self.table.name)?;
        for change in &self.changes {
            writeln!(f, "  {}", change)?;
        }
        Ok(())
    }
}

/// Whether Postgres can enforce a foreign key from a column of type `a` to a
/// key of type `b`.
fn comparable(a: &PgType, b: &PgType) -> bool {
    use PgType::*;
    let family = |t: &PgType| match t {
        SmallInt | Integer | BigInt => 0,
        Text | VarChar(_) => 1,
        Real | DoublePrecision => 2,
        Numeric(_) => 3,
        _ => 4,
    };
    a == b || (family(a) == family(b) && family(a) != 4)
}

fn config_error(table: &QualifiedName, reason: impl Into<String>) -> Error {
    Error::Configuration {
        table: table.unquoted(),
        reason: reason.into(),
    }
}

/// Plan the changes that turn `state` into `declared`.
///
/// Pure: reads nothing and executes nothing.
pub fn plan_table(
    state: &TableState,
    declared: &[ColumnDescriptor],
    options: &PlanOptions,
) -> Result<MigrationPlan> {
    let table = &state.table;

    if declared.is_empty() {
        return Err(config_error(table, "model declares no columns"));
    }
    let keys: Vec<&ColumnDescriptor> = declared.iter().filter(|c| c.primary_key).collect();
    if keys.len() > 1 {
        return Err(config_error(
            table,
            "model declares more than one primary key column",
        ));
    }
    let declared_pk = keys.first().copied();

    let live: IndexMap<&str, &LiveColumn> =
        state.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let declared_names: HashSet<&str> = declared.iter().map(|c| c.name.as_str()).collect();

    let mut added = Vec::new();
    let mut altered = Vec::new();
    for col in declared {
        match live.get(col.name.as_str()) {
            None => added.push(col),
            Some(current) if current.sql_type != col.sql_type || current.nullable != col.nullable => {
                altered.push((*current, col))
            }
            Some(_) => {}
        }
    }

    let mut dropped = Vec::new();
    for col in &state.columns {
        if declared_names.contains(col.name.as_str()) {
            continue;
        }
        match options.drop_columns {
            DropColumns::Drop => dropped.push(col),
            DropColumns::Keep => {
                tracing::info!(table = %table.unquoted(), column = %col.name, "keeping undeclared column");
            }
        }
    }

    let key_touched = |name: &str| {
        added.iter().any(|c| c.name == name) || altered.iter().any(|(_, c)| c.name == name)
    };
    let key_moved = match (&state.primary_key, declared_pk) {
        (Some(pk), Some(col)) => pk.columns != [col.name.as_str()] || key_touched(&col.name),
        _ => false,
    };
    let drop_pk = state.primary_key.is_some() && (declared_pk.is_none() || key_moved);
    let add_pk = declared_pk.is_some() && (state.primary_key.is_none() || key_moved);

    let dependents: &[Constraint] = if drop_pk { &state.dependents } else { &[] };
    if !dependents.is_empty() {
        let Some(pk_col) = declared_pk else {
            let names: Vec<&str> = dependents.iter().map(|fk| fk.name.as_str()).collect();
            return Err(config_error(
                table,
                format!(
                    "model declares no primary key but foreign keys reference it: {}",
                    names.join(", ")
                ),
            ));
        };
        if let Some(fk) = dependents.iter().find(|fk| fk.columns.len() != 1) {
            return Err(config_error(
                table,
                format!(
                    "foreign key {} on {}.{} spans {} columns and cannot reference single-column key {}",
                    fk.name,
                    fk.owner_schema,
                    fk.owner_table,
                    fk.columns.len(),
                    pk_col.name
                ),
            ));
        }
        for fk in dependents {
            // A self-reference follows its column if the model changes it.
            let owning_type = if fk.is_self_reference() {
                declared
                    .iter()
                    .find(|c| c.name == fk.columns[0])
                    .map(|c| &c.sql_type)
                    .or(fk.column_types.first())
            } else {
                fk.column_types.first()
            };
            if let Some(owning_type) = owning_type
                && !comparable(owning_type, &pk_col.sql_type)
            {
                return Err(config_error(
                    table,
                    format!(
                        "foreign key {} on {}.{} ({} {}) cannot reference {} {}",
                        fk.name,
                        fk.owner_schema,
                        fk.owner_table,
                        fk.columns[0],
                        owning_type,
                        pk_col.name,
                        pk_col.sql_type
                    ),
                ));
            }
        }
    }

    let mut changes = Vec::new();

    if !state.exists {
        changes.push(Change::CreateTable);
    }

    for fk in dependents {
        changes.push(Change::DropForeignKey(fk.clone()));
    }
    if drop_pk && let Some(pk) = &state.primary_key {
        changes.push(Change::DropPrimaryKey(pk.clone()));
    }

    for col in &added {
        changes.push(Change::AddColumn((*col).clone()));
    }
    for (from, to) in &altered {
        let change = Change::AlterColumn {
            from: (*from).clone(),
            to: (*to).clone(),
        };
        if change.is_destructive() {
            tracing::warn!(
                table = %table.unquoted(),
                column = %to.name,
                from = %from.sql_type,
                to = %to.sql_type,
                "type change may reject existing values"
            );
        }
        changes.push(change);
    }
    for col in &dropped {
        tracing::warn!(table = %table.unquoted(), column = %col.name, "dropping undeclared column");
        changes.push(Change::DropColumn((*col).clone()));
    }

    if add_pk && let Some(col) = declared_pk {
        changes.push(Change::AddPrimaryKey {
            name: primary_key_name(&table.name),
            column: col.name.clone(),
        });

        let dropped_names: HashSet<&str> = dropped.iter().map(|c| c.name.as_str()).collect();
        for fk in dependents {
            if fk.is_self_reference() && fk.columns.iter().any(|c| dropped_names.contains(c.as_str())) {
                tracing::info!(
                    table = %table.unquoted(),
                    constraint = %fk.name,
                    "not recreating self-referencing foreign key on a dropped column"
                );
                continue;
            }
            if let Some(def) = fk.to_foreign_key_def(vec![col.name.clone()]) {
                changes.push(Change::AddForeignKey(def));
            }
        }
    }

    Ok(MigrationPlan {
        table: table.clone(),
        changes,
    })
}
