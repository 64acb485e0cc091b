use shipshape_schema::ModelError;
use thiserror::Error;

use crate::solver::SolverError;

#[derive(Debug, Error)]
pub enum Error {
    /// The declared model is invalid. Raised before any database access.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The model is valid on its own but cannot be reconciled with the live
    /// table, or the migration options are invalid.
    #[error("configuration error for `{table}`: {reason}")]
    Configuration { table: String, reason: String },

    #[error("failed to read catalog for `{table}`: {source}")]
    CatalogRead {
        table: String,
        source: tokio_postgres::Error,
    },

    #[error(
        "statement {} of {total} failed on `{table}` ({applied} applied{}): {statement}: {source}",
        .index + 1,
        rollback_note(.rolled_back)
    )]
    DdlExecution {
        table: String,
        /// Zero-based position of the failing statement in the plan.
        index: usize,
        total: usize,
        statement: String,
        /// Statements that succeeded before the failure.
        applied: usize,
        /// Whether the applied statements were rolled back.
        rolled_back: bool,
        source: tokio_postgres::Error,
    },

    #[error("could not {stage} migration transaction for `{table}`: {source}")]
    Transaction {
        table: String,
        stage: &'static str,
        source: tokio_postgres::Error,
    },

    /// The planner produced a plan that does not pass simulation.
    #[error("plan for `{table}` is not executable: {source}")]
    InvalidPlan { table: String, source: SolverError },

    #[error("invalid value `{value}` for {name}")]
    InvalidOption { name: &'static str, value: String },
}

fn rollback_note(rolled_back: &bool) -> &'static str {
    if *rolled_back { ", rolled back" } else { "" }
}

impl Error {
    /// Whether the model declares a type with no Postgres mapping.
    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, Error::Model(e) if e.is_unsupported_type())
    }

    /// Whether this is a declaration or option problem the caller must fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Model(_) | Error::Configuration { .. } | Error::InvalidOption { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
