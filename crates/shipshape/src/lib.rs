//! Keep a Postgres schema in shape with a declared table model.
//!
//! shipshape compares each declared table against what the database catalog
//! says is there and computes the ordered DDL that closes the gap: added,
//! altered and dropped columns, and primary keys rebuilt around the foreign
//! keys that point at them. There are no migration files and no history. The
//! catalog is the only record of the current state, so re-running is always
//! safe.
//!
//! # Declaring tables
//!
//! Build models directly:
//!
//! ```
//! use shipshape::{ColumnDecl, LogicalType, TableModel};
//!
//! let user = TableModel::new("user")
//!     .column(ColumnDecl::new("id", LogicalType::Int64).primary_key())
//!     .column(ColumnDecl::new("email", "varchar(255)"))
//!     .column(ColumnDecl::new("bio", "text").nullable());
//! assert_eq!(user.descriptors().unwrap().len(), 3);
//! ```
//!
//! or register them at compile time and pick them up with
//! [`collect_models`]:
//!
//! ```ignore
//! shipshape::inventory::submit! {
//!     shipshape::EntityDef::new("user", &[
//!         shipshape::StaticColumn::new("id", "i64").primary_key(),
//!         shipshape::StaticColumn::new("bio", "text").nullable(),
//!     ])
//! }
//! ```
//!
//! # Migrating
//!
//! ```ignore
//! let migrator = Migrator::new(&client);
//! let plan = migrator.plan(&user).await?;
//! println!("{plan}");
//! migrator.apply(&user).await?;
//! ```

pub mod catalog;
pub mod diff;
mod error;
pub mod executor;
mod migrate;
mod options;
pub mod solver;
mod traced;

pub use diff::{Change, DropColumns, MigrationPlan, PlanOptions, plan_table};
pub use error::{Error, Result};
pub use executor::{Atomicity, ExecutionReport};
pub use migrate::{ApplyOutcome, Migrator};
pub use options::MigrateOptions;
pub use solver::SolverError;
pub use traced::{Connection, ConnectionExt, TracedConn};

pub use shipshape_schema::{
    ColumnDecl, ColumnDescriptor, Constraint, EntityDef, LiveColumn, LogicalType,
    ModelError, PgType, QualifiedName, ReferentialAction, StaticColumn, TableModel, TableState,
    TypeRef, collect_models, column_type_sql, map_type,
};

// Re-exported so registrations don't need their own dependency
pub use inventory;
