//! DDL statements.

use crate::QualifiedName;

/// A schema-changing statement.
///
/// Type names are carried pre-rendered (e.g. `"NUMERIC(18,2)"`); everything
/// that names a database object is quoted at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlStmt {
    /// `CREATE TABLE t ()` - an empty shell that columns are added to.
    CreateTable { table: QualifiedName },

    AddColumn {
        table: QualifiedName,
        column: String,
        sql_type: String,
        nullable: bool,
    },

    DropColumn {
        table: QualifiedName,
        column: String,
    },

    /// One or more alterations of a single column, applied in one statement.
    AlterColumn {
        table: QualifiedName,
        column: String,
        actions: Vec<AlterAction>,
    },

    DropConstraint {
        table: QualifiedName,
        name: String,
    },

    AddPrimaryKey {
        table: QualifiedName,
        name: String,
        columns: Vec<String>,
    },

    AddForeignKey(ForeignKeyDef),
}

/// A single `ALTER COLUMN` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterAction {
    /// `TYPE t`, converting existing values with the assignment cast. Values
    /// that do not fit the new type fail the statement instead of being
    /// truncated.
    SetType(String),
    SetNotNull,
    DropNotNull,
}

/// Everything needed to (re)create a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    /// Table that owns the constraint.
    pub table: QualifiedName,
    pub name: String,
    pub columns: Vec<String>,
    pub references: QualifiedName,
    pub referenced_columns: Vec<String>,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
}

/// What happens to referencing rows when the referenced key changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse the spelling used by `information_schema.referential_constraints`.
    pub fn parse(rule: &str) -> Option<Self> {
        match rule.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" => Some(ReferentialAction::NoAction),
            "RESTRICT" => Some(ReferentialAction::Restrict),
            "CASCADE" => Some(ReferentialAction::Cascade),
            "SET NULL" => Some(ReferentialAction::SetNull),
            "SET DEFAULT" => Some(ReferentialAction::SetDefault),
            _ => None,
        }
    }
}
