//! Live table state, as read from the catalog.

use shipshape_sql::{ForeignKeyDef, QualifiedName, ReferentialAction};

use crate::{PgType, null_clause};

/// A column that exists in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    pub name: String,
    pub sql_type: PgType,
    pub nullable: bool,
}

impl LiveColumn {
    pub fn new(name: impl Into<String>, sql_type: PgType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable,
        }
    }

    /// The full column clause, e.g. `INTEGER NOT NULL`.
    pub fn column_sql(&self) -> String {
        format!("{} {}", self.sql_type, null_clause(self.nullable))
    }
}

/// A named key constraint.
///
/// A primary key has no `referenced_table`. For a foreign key, `owner_*` is
/// the referencing table and `referenced_*` the key it points at. Column lists
/// are in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub owner_schema: String,
    pub owner_table: String,
    pub columns: Vec<String>,
    /// Live types of `columns`, when the catalog reader resolved them.
    pub column_types: Vec<PgType>,
    pub referenced_table: Option<QualifiedName>,
    pub referenced_columns: Vec<String>,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
}

impl Constraint {
    pub fn primary_key(owner: &QualifiedName, name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            owner_schema: owner.schema.clone(),
            owner_table: owner.name.clone(),
            columns,
            column_types: Vec::new(),
            referenced_table: None,
            referenced_columns: Vec::new(),
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::NoAction,
        }
    }

    pub fn foreign_key(
        owner: &QualifiedName,
        name: impl Into<String>,
        columns: Vec<String>,
        references: QualifiedName,
        referenced_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            owner_schema: owner.schema.clone(),
            owner_table: owner.name.clone(),
            columns,
            column_types: Vec::new(),
            referenced_table: Some(references),
            referenced_columns,
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::NoAction,
        }
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn with_column_types(mut self, types: Vec<PgType>) -> Self {
        self.column_types = types;
        self
    }

    pub fn owner(&self) -> QualifiedName {
        QualifiedName::new(&self.owner_schema, &self.owner_table)
    }

    /// Whether this foreign key is declared on the table it references.
    pub fn is_self_reference(&self) -> bool {
        self.referenced_table
            .as_ref()
            .is_some_and(|t| t.schema == self.owner_schema && t.name == self.owner_table)
    }

    /// Definition that recreates this foreign key with the same name, columns
    /// and rules, pointing at `references`.
    ///
    /// Returns `None` for primary keys.
    pub fn to_foreign_key_def(&self, referenced_columns: Vec<String>) -> Option<ForeignKeyDef> {
        let references = self.referenced_table.clone()?;
        Some(ForeignKeyDef {
            table: self.owner(),
            name: self.name.clone(),
            columns: self.columns.clone(),
            references,
            referenced_columns,
            on_update: self.on_update,
            on_delete: self.on_delete,
        })
    }
}

/// Everything the planner needs to know about one live table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    pub table: QualifiedName,
    pub exists: bool,
    /// Columns in ordinal order.
    pub columns: Vec<LiveColumn>,
    pub primary_key: Option<Constraint>,
    /// Foreign keys, on any table, that reference this table's primary key.
    /// Ordered by owner schema, owner table, then constraint name.
    pub dependents: Vec<Constraint>,
}

impl TableState {
    /// State of a table that does not exist yet.
    pub fn missing(table: QualifiedName) -> Self {
        Self {
            table,
            exists: false,
            columns: Vec::new(),
            primary_key: None,
            dependents: Vec::new(),
        }
    }

    /// State of an existing table with the given columns and no keys.
    pub fn existing(table: QualifiedName, columns: Vec<LiveColumn>) -> Self {
        Self {
            table,
            exists: true,
            columns,
            primary_key: None,
            dependents: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        let name = shipshape_sql::primary_key_name(&self.table.name);
        self.primary_key = Some(Constraint::primary_key(
            &self.table,
            name,
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    pub fn with_dependent(mut self, fk: Constraint) -> Self {
        self.dependents.push(fk);
        self
    }

    pub fn column(&self, name: &str) -> Option<&LiveColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}
