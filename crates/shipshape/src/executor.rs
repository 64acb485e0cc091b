//! DDL executor - runs a plan's statements in order.

use crate::diff::MigrationPlan;
use crate::{Connection, ConnectionExt, Error, Result};

/// How statements in one plan are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Atomicity {
    /// Each statement commits on its own. A failure leaves the statements
    /// before it applied.
    #[default]
    PerStatement,
    /// The whole plan runs in one transaction and is rolled back on failure.
    /// Everything the planner emits is transactional DDL in Postgres.
    Transaction,
}

/// How far a plan got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionReport {
    pub applied: usize,
    pub total: usize,
}

/// Execute `plan` against `conn`, stopping at the first failure.
pub async fn execute<C: Connection>(
    conn: &C,
    plan: &MigrationPlan,
    atomicity: Atomicity,
) -> Result<ExecutionReport> {
    let statements = plan.statements();
    let total = statements.len();
    let table = plan.table.unquoted();
    if total == 0 {
        return Ok(ExecutionReport { applied: 0, total });
    }

    let conn = conn.traced();
    let transactional = atomicity == Atomicity::Transaction;
    if transactional {
        conn.batch_execute("BEGIN")
            .await
            .map_err(|source| Error::Transaction {
                table: table.clone(),
                stage: "begin",
                source,
            })?;
    }

    for (index, statement) in statements.iter().enumerate() {
        if let Err(source) = conn.batch_execute(statement).await {
            let rolled_back = transactional
                && match conn.batch_execute("ROLLBACK").await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(table = %table, error = %e, "rollback failed");
                        false
                    }
                };
            tracing::error!(
                table = %table,
                index,
                total,
                statement = %statement,
                rolled_back,
                "migration statement failed"
            );
            return Err(Error::DdlExecution {
                table,
                index,
                total,
                statement: statement.clone(),
                applied: index,
                rolled_back,
                source,
            });
        }
    }

    if transactional {
        conn.batch_execute("COMMIT")
            .await
            .map_err(|source| Error::Transaction {
                table: table.clone(),
                stage: "commit",
                source,
            })?;
    }

    tracing::info!(table = %table, applied = total, "migration applied");
    Ok(ExecutionReport {
        applied: total,
        total,
    })
}
