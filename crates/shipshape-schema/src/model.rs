//! The declared table model and its validated, mapped form.

use std::collections::HashSet;

use shipshape_sql::{IdentError, validate_ident};

use crate::{LogicalType, PgType, map_type, null_clause};

/// Errors in a declared model. All of these are raised before any database
/// access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("table `{table}` declares no columns")]
    NoColumns { table: String },

    #[error("invalid table name `{table}`: {source}")]
    InvalidTableName { table: String, source: IdentError },

    #[error("invalid column name `{column}` in table `{table}`: {source}")]
    InvalidColumnName {
        table: String,
        column: String,
        source: IdentError,
    },

    #[error("column `{column}` is declared more than once in table `{table}`")]
    DuplicateColumn { table: String, column: String },

    #[error("table `{table}` declares more than one primary key column: {}", .columns.join(", "))]
    MultiplePrimaryKeys { table: String, columns: Vec<String> },

    #[error("primary key column `{column}` of table `{table}` cannot be nullable")]
    NullablePrimaryKey { table: String, column: String },

    #[error("unsupported type `{type_name}` for column `{column}` of table `{table}`")]
    UnsupportedType {
        table: String,
        column: String,
        type_name: String,
    },
}

impl ModelError {
    /// Whether this error comes from the type mapper rather than from the
    /// shape of the model.
    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, ModelError::UnsupportedType { .. })
    }
}

/// A column's declared type: either already resolved, or a name still to be
/// resolved by [`LogicalType::from_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Logical(LogicalType),
    Named(String),
}

impl TypeRef {
    /// The logical type, or `None` if the name is unknown or the parameters
    /// are out of range.
    pub fn resolve(&self) -> Option<LogicalType> {
        match self {
            TypeRef::Logical(ty) => ty.is_valid().then_some(*ty),
            TypeRef::Named(name) => LogicalType::from_name(name),
        }
    }
}

impl From<LogicalType> for TypeRef {
    fn from(ty: LogicalType) -> Self {
        TypeRef::Logical(ty)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::Named(name.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::Named(name)
    }
}

/// A declared column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDecl {
    pub name: String,
    pub ty: TypeRef,
    pub primary_key: bool,
    pub nullable: bool,
}

impl ColumnDecl {
    /// A non-null, non-key column.
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            primary_key: false,
            nullable: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A declared table: a name and an ordered list of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    pub name: String,
    pub columns: Vec<ColumnDecl>,
}

impl TableModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDecl) -> Self {
        self.columns.push(column);
        self
    }

    /// Validate the model and map every column to its Postgres type.
    ///
    /// Descriptors come back in declaration order. The first problem found
    /// wins, checking the table name first, then each column in order, then
    /// the primary key.
    pub fn descriptors(&self) -> Result<Vec<ColumnDescriptor>, ModelError> {
        validate_ident(&self.name).map_err(|source| ModelError::InvalidTableName {
            table: self.name.clone(),
            source,
        })?;

        if self.columns.is_empty() {
            return Err(ModelError::NoColumns {
                table: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        let mut descriptors = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            validate_ident(&col.name).map_err(|source| ModelError::InvalidColumnName {
                table: self.name.clone(),
                column: col.name.clone(),
                source,
            })?;
            if !seen.insert(col.name.as_str()) {
                return Err(ModelError::DuplicateColumn {
                    table: self.name.clone(),
                    column: col.name.clone(),
                });
            }
            let logical = col.ty.resolve().ok_or_else(|| ModelError::UnsupportedType {
                table: self.name.clone(),
                column: col.name.clone(),
                type_name: match &col.ty {
                    TypeRef::Named(name) => name.clone(),
                    TypeRef::Logical(ty) => format!("{:?}", ty),
                },
            })?;
            descriptors.push(ColumnDescriptor {
                name: col.name.clone(),
                sql_type: map_type(logical),
                primary_key: col.primary_key,
                nullable: col.nullable,
            });
        }

        let keys: Vec<&ColumnDescriptor> = descriptors.iter().filter(|d| d.primary_key).collect();
        if keys.len() > 1 {
            return Err(ModelError::MultiplePrimaryKeys {
                table: self.name.clone(),
                columns: keys.iter().map(|d| d.name.clone()).collect(),
            });
        }
        if let Some(pk) = keys.first()
            && pk.nullable
        {
            return Err(ModelError::NullablePrimaryKey {
                table: self.name.clone(),
                column: pk.name.clone(),
            });
        }

        Ok(descriptors)
    }
}

/// A declared column after validation and type mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: PgType,
    pub primary_key: bool,
    pub nullable: bool,
}

impl ColumnDescriptor {
    /// The full column clause, e.g. `BIGINT NOT NULL`.
    pub fn column_sql(&self) -> String {
        format!("{} {}", self.sql_type, null_clause(self.nullable))
    }
}
