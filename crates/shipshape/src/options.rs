//! Migration options.

use crate::diff::{DropColumns, PlanOptions};
use crate::executor::Atomicity;
use crate::{Error, Result};

/// How the [`Migrator`](crate::Migrator) plans and applies changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateOptions {
    /// Schema the models live in.
    pub schema: String,
    pub drop_columns: DropColumns,
    pub atomicity: Atomicity,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            drop_columns: DropColumns::Drop,
            atomicity: Atomicity::PerStatement,
        }
    }
}

impl MigrateOptions {
    /// Defaults, overridden by `SHIPSHAPE_SCHEMA`, `SHIPSHAPE_DROP_COLUMNS`
    /// (`drop` or `keep`) and `SHIPSHAPE_ATOMICITY` (`statement` or
    /// `transaction`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();
        if let Some(schema) = lookup("SHIPSHAPE_SCHEMA") {
            options.schema = schema;
        }
        if let Some(value) = lookup("SHIPSHAPE_DROP_COLUMNS") {
            options.drop_columns = match value.trim().to_ascii_lowercase().as_str() {
                "drop" => DropColumns::Drop,
                "keep" => DropColumns::Keep,
                _ => {
                    return Err(Error::InvalidOption {
                        name: "SHIPSHAPE_DROP_COLUMNS",
                        value,
                    });
                }
            };
        }
        if let Some(value) = lookup("SHIPSHAPE_ATOMICITY") {
            options.atomicity = match value.trim().to_ascii_lowercase().as_str() {
                "statement" => Atomicity::PerStatement,
                "transaction" => Atomicity::Transaction,
                _ => {
                    return Err(Error::InvalidOption {
                        name: "SHIPSHAPE_ATOMICITY",
                        value,
                    });
                }
            };
        }
        Ok(options)
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn drop_columns(mut self, drop_columns: DropColumns) -> Self {
        self.drop_columns = drop_columns;
        self
    }

    pub fn atomicity(mut self, atomicity: Atomicity) -> Self {
        self.atomicity = atomicity;
        self
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            drop_columns: self.drop_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = MigrateOptions::from_lookup(lookup(&[])).unwrap();
        assert_eq!(options, MigrateOptions::default());
        assert_eq!(options.schema, "public");
        assert_eq!(options.drop_columns, DropColumns::Drop);
        assert_eq!(options.atomicity, Atomicity::PerStatement);
    }

    #[test]
    fn test_overrides() {
        let options = MigrateOptions::from_lookup(lookup(&[
            ("SHIPSHAPE_SCHEMA", "billing"),
            ("SHIPSHAPE_DROP_COLUMNS", "Keep"),
            ("SHIPSHAPE_ATOMICITY", "transaction"),
        ]))
        .unwrap();
        assert_eq!(
            options,
            MigrateOptions::default()
                .schema("billing")
                .drop_columns(DropColumns::Keep)
                .atomicity(Atomicity::Transaction)
        );
    }

    #[test]
    fn test_invalid_value() {
        let err =
            MigrateOptions::from_lookup(lookup(&[("SHIPSHAPE_ATOMICITY", "sometimes")])).unwrap_err();
        assert_eq!(err.to_string(), "invalid value `sometimes` for SHIPSHAPE_ATOMICITY");
        assert!(err.is_configuration());
    }
}
