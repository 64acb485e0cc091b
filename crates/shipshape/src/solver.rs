//! Plan solver - checks that a plan can run, statement by statement.
//!
//! The solver replays a [`MigrationPlan`] against a virtual copy of the live
//! table and checks each change's preconditions as Postgres would:
//!
//! ```text
//! -- This fails:
//! ALTER TABLE "public"."user" DROP CONSTRAINT "user_pkey";   -- still referenced!
//! ALTER TABLE "public"."post" DROP CONSTRAINT "post_author_id_fkey";
//!
//! -- This works:
//! ALTER TABLE "public"."post" DROP CONSTRAINT "post_author_id_fkey";
//! ALTER TABLE "public"."user" DROP CONSTRAINT "user_pkey";
//! ```
//!
//! A plan that passes [`verify`] never has a statement that depends on one
//! emitted after it.

use shipshape_schema::{Constraint, LiveColumn, TableState};

use crate::diff::{Change, MigrationPlan};

/// Error when a plan cannot be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// A change requires a table that doesn't exist.
    TableNotFound { change: String, table: String },
    /// A change requires a table to NOT exist, but it does.
    TableAlreadyExists { change: String, table: String },
    /// A change requires a column that doesn't exist.
    ColumnNotFound {
        change: String,
        table: String,
        column: String,
    },
    /// A change requires a column to NOT exist, but it does.
    ColumnAlreadyExists {
        change: String,
        table: String,
        column: String,
    },
    /// A change drops a constraint that doesn't exist.
    ConstraintNotFound {
        change: String,
        table: String,
        constraint: String,
    },
    /// A primary key is added while another one exists.
    PrimaryKeyExists {
        change: String,
        table: String,
        constraint: String,
    },
    /// The primary key is dropped while foreign keys still reference it.
    PrimaryKeyReferenced {
        change: String,
        table: String,
        constraints: Vec<String>,
    },
    /// A column is altered or dropped while it is part of the primary key.
    KeyColumnInUse {
        change: String,
        table: String,
        column: String,
    },
    /// A primary key is placed on a nullable column.
    NullableKeyColumn {
        change: String,
        table: String,
        column: String,
    },
    /// A foreign key points at something other than the current primary key.
    ForeignKeyTargetMismatch {
        change: String,
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::TableNotFound { change, table } => {
                write!(f, "{}: table '{}' does not exist", change, table)
            }
            SolverError::TableAlreadyExists { change, table } => {
                write!(f, "{}: table '{}' already exists", change, table)
            }
            SolverError::ColumnNotFound {
                change,
                table,
                column,
            } => {
                write!(f, "{}: column '{}.{}' does not exist", change, table, column)
            }
            SolverError::ColumnAlreadyExists {
                change,
                table,
                column,
            } => {
                write!(f, "{}: column '{}.{}' already exists", change, table, column)
            }
            SolverError::ConstraintNotFound {
                change,
                table,
                constraint,
            } => {
                write!(
                    f,
                    "{}: constraint '{}' does not exist on '{}'",
                    change, constraint, table
                )
            }
            SolverError::PrimaryKeyExists {
                change,
                table,
                constraint,
            } => {
                write!(
                    f,
                    "{}: table '{}' already has primary key '{}'",
                    change, table, constraint
                )
            }
            SolverError::PrimaryKeyReferenced {
                change,
                table,
                constraints,
            } => {
                write!(
                    f,
                    "{}: primary key of '{}' is still referenced by {}",
                    change,
                    table,
                    constraints.join(", ")
                )
            }
            SolverError::KeyColumnInUse {
                change,
                table,
                column,
            } => {
                write!(
                    f,
                    "{}: column '{}.{}' is part of the primary key",
                    change, table, column
                )
            }
            SolverError::NullableKeyColumn {
                change,
                table,
                column,
            } => {
                write!(
                    f,
                    "{}: primary key column '{}.{}' is nullable",
                    change, table, column
                )
            }
            SolverError::ForeignKeyTargetMismatch {
                change,
                table,
                expected,
                found,
            } => {
                write!(
                    f,
                    "{}: foreign key references ({}) but the primary key of '{}' is ({})",
                    change,
                    found.join(", "),
                    table,
                    expected.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for SolverError {}

/// Virtual copy of a table for simulation.
#[derive(Debug, Clone)]
pub struct VirtualTable {
    state: TableState,
}

impl VirtualTable {
    pub fn new(state: &TableState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    pub fn into_state(self) -> TableState {
        self.state
    }

    fn name(&self) -> String {
        self.state.table.unquoted()
    }

    fn in_primary_key(&self, column: &str) -> bool {
        self.state
            .primary_key
            .as_ref()
            .is_some_and(|pk| pk.columns.iter().any(|c| c == column))
    }

    fn position(&self, change: &str, column: &str) -> Result<usize, SolverError> {
        self.state
            .columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| SolverError::ColumnNotFound {
                change: change.to_string(),
                table: self.name(),
                column: column.to_string(),
            })
    }

    /// Apply a change to the virtual table, validating preconditions.
    pub fn apply(&mut self, change: &Change) -> Result<(), SolverError> {
        let desc = change.to_string();
        let table = self.name();

        if let Change::CreateTable = change {
            if self.state.exists {
                return Err(SolverError::TableAlreadyExists {
                    change: desc,
                    table,
                });
            }
            self.state.exists = true;
            return Ok(());
        }

        if !self.state.exists {
            return Err(SolverError::TableNotFound {
                change: desc,
                table,
            });
        }

        match change {
            Change::CreateTable => {}

            Change::DropForeignKey(fk) => {
                let idx = self
                    .state
                    .dependents
                    .iter()
                    .position(|d| d.name == fk.name && d.owner() == fk.owner())
                    .ok_or_else(|| SolverError::ConstraintNotFound {
                        change: desc.clone(),
                        table: format!("{}.{}", fk.owner_schema, fk.owner_table),
                        constraint: fk.name.clone(),
                    })?;
                self.state.dependents.remove(idx);
            }

            Change::DropPrimaryKey(pk) => {
                match &self.state.primary_key {
                    Some(current) if current.name == pk.name => {}
                    _ => {
                        return Err(SolverError::ConstraintNotFound {
                            change: desc,
                            table,
                            constraint: pk.name.clone(),
                        });
                    }
                }
                if !self.state.dependents.is_empty() {
                    return Err(SolverError::PrimaryKeyReferenced {
                        change: desc,
                        table,
                        constraints: self
                            .state
                            .dependents
                            .iter()
                            .map(|d| d.name.clone())
                            .collect(),
                    });
                }
                // Key columns stay NOT NULL after the key is gone.
                self.state.primary_key = None;
            }

            Change::AddColumn(col) => {
                if self.state.column(&col.name).is_some() {
                    return Err(SolverError::ColumnAlreadyExists {
                        change: desc,
                        table,
                        column: col.name.clone(),
                    });
                }
                self.state.columns.push(LiveColumn::new(
                    col.name.clone(),
                    col.sql_type.clone(),
                    col.nullable,
                ));
            }

            Change::AlterColumn { to, .. } => {
                let idx = self.position(&desc, &to.name)?;
                if self.in_primary_key(&to.name) {
                    return Err(SolverError::KeyColumnInUse {
                        change: desc,
                        table,
                        column: to.name.clone(),
                    });
                }
                let column = &mut self.state.columns[idx];
                column.sql_type = to.sql_type.clone();
                column.nullable = to.nullable;
            }

            Change::DropColumn(col) => {
                let idx = self.position(&desc, &col.name)?;
                if self.in_primary_key(&col.name) {
                    return Err(SolverError::KeyColumnInUse {
                        change: desc,
                        table,
                        column: col.name.clone(),
                    });
                }
                self.state.columns.remove(idx);
                // Postgres drops this table's constraints on the column with it.
                let owner = self.state.table.clone();
                self.state
                    .dependents
                    .retain(|d| !(d.owner() == owner && d.columns.contains(&col.name)));
            }

            Change::AddPrimaryKey { name, column } => {
                if let Some(pk) = &self.state.primary_key {
                    return Err(SolverError::PrimaryKeyExists {
                        change: desc,
                        table,
                        constraint: pk.name.clone(),
                    });
                }
                let idx = self.position(&desc, column)?;
                if self.state.columns[idx].nullable {
                    return Err(SolverError::NullableKeyColumn {
                        change: desc,
                        table,
                        column: column.clone(),
                    });
                }
                self.state.primary_key = Some(Constraint::primary_key(
                    &self.state.table,
                    name.clone(),
                    vec![column.clone()],
                ));
            }

            Change::AddForeignKey(fk) => {
                let expected = self
                    .state
                    .primary_key
                    .as_ref()
                    .map(|pk| pk.columns.clone())
                    .unwrap_or_default();
                if fk.references != self.state.table || fk.referenced_columns != expected {
                    return Err(SolverError::ForeignKeyTargetMismatch {
                        change: desc,
                        table,
                        expected,
                        found: fk.referenced_columns.clone(),
                    });
                }
                if fk.table == self.state.table {
                    for column in &fk.columns {
                        self.position(&desc, column)?;
                    }
                }
                self.state.dependents.push(
                    Constraint::foreign_key(
                        &fk.table,
                        fk.name.clone(),
                        fk.columns.clone(),
                        fk.references.clone(),
                        fk.referenced_columns.clone(),
                    )
                    .on_update(fk.on_update)
                    .on_delete(fk.on_delete),
                );
            }
        }
        Ok(())
    }
}

/// Replay `plan` against `state` and return the resulting table state.
pub fn simulate(state: &TableState, plan: &MigrationPlan) -> Result<TableState, SolverError> {
    let mut table = VirtualTable::new(state);
    for change in &plan.changes {
        table.apply(change)?;
    }
    Ok(table.into_state())
}

/// Check that every change in `plan` can run after the ones before it.
pub fn verify(state: &TableState, plan: &MigrationPlan) -> Result<(), SolverError> {
    simulate(state, plan).map(|_| ())
}
