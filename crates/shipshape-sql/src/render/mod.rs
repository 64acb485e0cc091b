//! Render DDL statements to SQL text.

use std::fmt;

use crate::stmt::*;
use crate::Ident;

impl fmt::Display for DdlStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdlStmt::CreateTable { table } => write!(f, "CREATE TABLE {table} ();"),
            DdlStmt::AddColumn {
                table,
                column,
                sql_type,
                nullable,
            } => {
                let null = if *nullable { "NULL" } else { "NOT NULL" };
                let column = Ident(column);
                write!(f, "ALTER TABLE {table} ADD COLUMN {column} {sql_type} {null};")
            }
            DdlStmt::DropColumn { table, column } => {
                let column = Ident(column);
                write!(f, "ALTER TABLE {table} DROP COLUMN {column};")
            }
            DdlStmt::AlterColumn {
                table,
                column,
                actions,
            } => {
                let column = Ident(column);
                write!(f, "ALTER TABLE {table} ")?;
                for (i, action) in actions.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match action {
                        AlterAction::SetType(ty) => write!(f, "ALTER COLUMN {column} TYPE {ty}")?,
                        AlterAction::SetNotNull => write!(f, "ALTER COLUMN {column} SET NOT NULL")?,
                        AlterAction::DropNotNull => {
                            write!(f, "ALTER COLUMN {column} DROP NOT NULL")?
                        }
                    }
                }
                write!(f, ";")
            }
            DdlStmt::DropConstraint { table, name } => {
                let name = Ident(name);
                write!(f, "ALTER TABLE {table} DROP CONSTRAINT {name};")
            }
            DdlStmt::AddPrimaryKey {
                table,
                name,
                columns,
            } => {
                let name = Ident(name);
                let columns = ident_list(columns);
                write!(
                    f,
                    "ALTER TABLE {table} ADD CONSTRAINT {name} PRIMARY KEY ({columns});"
                )
            }
            DdlStmt::AddForeignKey(fk) => {
                let table = &fk.table;
                let name = Ident(&fk.name);
                let columns = ident_list(&fk.columns);
                let references = &fk.references;
                let referenced = ident_list(&fk.referenced_columns);
                write!(
                    f,
                    "ALTER TABLE {table} ADD CONSTRAINT {name} FOREIGN KEY ({columns}) REFERENCES {references} ({referenced})"
                )?;
                // NO ACTION is the default; leaving it out keeps the SQL readable
                if fk.on_update != ReferentialAction::NoAction {
                    write!(f, " ON UPDATE {}", fk.on_update.as_sql())?;
                }
                if fk.on_delete != ReferentialAction::NoAction {
                    write!(f, " ON DELETE {}", fk.on_delete.as_sql())?;
                }
                write!(f, ";")
            }
        }
    }
}

impl DdlStmt {
    /// Render this statement to SQL.
    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

/// Render a sequence of statements, preserving order.
pub fn render_all<'a>(stmts: impl IntoIterator<Item = &'a DdlStmt>) -> Vec<String> {
    stmts.into_iter().map(DdlStmt::to_sql).collect()
}

fn ident_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| Ident(n).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
