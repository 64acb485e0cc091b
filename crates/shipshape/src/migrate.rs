//! Migration orchestration.

use shipshape_schema::{ColumnDescriptor, QualifiedName, TableModel};
use shipshape_sql::validate_ident;

use crate::diff::{MigrationPlan, plan_table};
use crate::executor::{ExecutionReport, execute};
use crate::options::MigrateOptions;
use crate::{Connection, Error, Result, catalog, solver};

/// A plan together with how much of it ran.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub plan: MigrationPlan,
    pub report: ExecutionReport,
}

/// Plans and applies table models against one connection.
///
/// # Example
///
/// ```ignore
/// let migrator = Migrator::new(&client).with_options(MigrateOptions::from_env()?);
/// let outcome = migrator.apply(&model).await?;
/// println!("{}", outcome.plan);
/// ```
pub struct Migrator<'a, C: Connection> {
    conn: &'a C,
    options: MigrateOptions,
}

impl<'a, C: Connection> Migrator<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self {
            conn,
            options: MigrateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MigrateOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate a model and resolve its types. Touches no database.
    fn prepare(&self, model: &TableModel) -> Result<(QualifiedName, Vec<ColumnDescriptor>)> {
        validate_ident(&self.options.schema).map_err(|e| Error::Configuration {
            table: model.name.clone(),
            reason: format!("invalid schema name: {}", e),
        })?;
        let declared = model.descriptors()?;
        Ok((QualifiedName::new(&self.options.schema, &model.name), declared))
    }

    async fn plan_prepared(
        &self,
        table: &QualifiedName,
        declared: &[ColumnDescriptor],
    ) -> Result<MigrationPlan> {
        let state = catalog::read_table_state(self.conn, table).await?;
        let plan = plan_table(&state, declared, &self.options.plan_options())?;
        solver::verify(&state, &plan).map_err(|source| Error::InvalidPlan {
            table: table.unquoted(),
            source,
        })?;
        if plan.is_empty() {
            tracing::debug!(table = %table.unquoted(), "table up to date");
        } else {
            tracing::info!(table = %table.unquoted(), changes = plan.len(), "planned migration");
        }
        Ok(plan)
    }

    /// Plan the changes for one model against the live table.
    ///
    /// The model is validated before the catalog is read.
    pub async fn plan(&self, model: &TableModel) -> Result<MigrationPlan> {
        let (table, declared) = self.prepare(model)?;
        self.plan_prepared(&table, &declared).await
    }

    /// Plan and execute the changes for one model.
    pub async fn apply(&self, model: &TableModel) -> Result<ApplyOutcome> {
        let plan = self.plan(model).await?;
        let report = execute(self.conn, &plan, self.options.atomicity).await?;
        Ok(ApplyOutcome { plan, report })
    }

    /// Plan every model. All models are validated before any is planned.
    pub async fn plan_all(&self, models: &[TableModel]) -> Result<Vec<MigrationPlan>> {
        let prepared = models
            .iter()
            .map(|m| self.prepare(m))
            .collect::<Result<Vec<_>>>()?;
        let mut plans = Vec::with_capacity(prepared.len());
        for (table, declared) in &prepared {
            plans.push(self.plan_prepared(table, declared).await?);
        }
        Ok(plans)
    }

    /// Apply every model in order, stopping at the first failure.
    ///
    /// All models are validated up front. Each table is planned right before
    /// it is applied, so earlier tables' changes are visible to later plans.
    pub async fn apply_all(&self, models: &[TableModel]) -> Result<Vec<ApplyOutcome>> {
        let prepared = models
            .iter()
            .map(|m| self.prepare(m))
            .collect::<Result<Vec<_>>>()?;
        let mut outcomes = Vec::with_capacity(prepared.len());
        for (table, declared) in &prepared {
            let plan = self.plan_prepared(table, declared).await?;
            let report = execute(self.conn, &plan, self.options.atomicity).await?;
            outcomes.push(ApplyOutcome { plan, report });
        }
        Ok(outcomes)
    }
}
