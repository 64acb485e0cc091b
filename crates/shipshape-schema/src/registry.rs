//! Compile-time registration of table models.
//!
//! Crates declare their tables with [`inventory::submit!`] and the migrator
//! picks them up with [`collect_models`]:
//!
//! ```ignore
//! inventory::submit! {
//!     EntityDef::new("orders", &[
//!         StaticColumn::new("id", "i64").primary_key(),
//!         StaticColumn::new("note", "text").nullable(),
//!     ])
//! }
//! ```

use crate::{ColumnDecl, TableModel};

/// A column known at compile time. The type is a name resolved later by
/// [`LogicalType::from_name`](crate::LogicalType::from_name).
#[derive(Debug, Clone, Copy)]
pub struct StaticColumn {
    pub name: &'static str,
    pub ty: &'static str,
    pub primary_key: bool,
    pub nullable: bool,
}

impl StaticColumn {
    pub const fn new(name: &'static str, ty: &'static str) -> Self {
        Self {
            name,
            ty,
            primary_key: false,
            nullable: false,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A registered table definition.
#[derive(Debug)]
pub struct EntityDef {
    pub table: &'static str,
    pub columns: &'static [StaticColumn],
}

impl EntityDef {
    pub const fn new(table: &'static str, columns: &'static [StaticColumn]) -> Self {
        Self { table, columns }
    }

    pub fn to_model(&self) -> TableModel {
        let columns = self
            .columns
            .iter()
            .map(|c| ColumnDecl {
                name: c.name.to_string(),
                ty: c.ty.into(),
                primary_key: c.primary_key,
                nullable: c.nullable,
            })
            .collect();
        TableModel {
            name: self.table.to_string(),
            columns,
        }
    }
}

inventory::collect!(EntityDef);

/// All registered models, sorted by table name.
pub fn collect_models() -> Vec<TableModel> {
    let mut models: Vec<TableModel> = inventory::iter::<EntityDef>
        .into_iter()
        .map(EntityDef::to_model)
        .collect();
    models.sort_by(|a, b| a.name.cmp(&b.name));
    models
}
