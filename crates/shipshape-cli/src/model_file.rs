//! Model files.
//!
//! A model file is TOML with one `[[table]]` entry per table:
//!
//! ```toml
//! [[table]]
//! name = "user"
//! columns = [
//!   { name = "id", type = "i64", primary_key = true },
//!   { name = "email", type = "varchar(255)" },
//!   { name = "bio", type = "text", nullable = true },
//! ]
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use shipshape::{ColumnDecl, TableModel};

#[derive(Debug, thiserror::Error)]
pub enum ModelFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        source: toml::de::Error,
    },

    #[error("table `{0}` is declared more than once")]
    DuplicateTable(String),

    #[error("table `{0}` is not in the model file")]
    UnknownTable(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    #[serde(default)]
    table: Vec<TableEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableEntry {
    name: String,
    #[serde(default)]
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnEntry {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    primary_key: bool,
    #[serde(default)]
    nullable: bool,
}

impl From<TableEntry> for TableModel {
    fn from(entry: TableEntry) -> Self {
        let columns = entry
            .columns
            .into_iter()
            .map(|c| ColumnDecl {
                name: c.name,
                ty: c.ty.into(),
                primary_key: c.primary_key,
                nullable: c.nullable,
            })
            .collect();
        TableModel {
            name: entry.name,
            columns,
        }
    }
}

/// Parse model file contents. Types are resolved later, by the migrator.
pub fn parse(path: &Utf8Path, source: &str) -> Result<Vec<TableModel>, ModelFileError> {
    let file: ModelFile = toml::from_str(source).map_err(|source| ModelFileError::Parse {
        path: path.to_owned(),
        source,
    })?;

    let mut models: Vec<TableModel> = Vec::with_capacity(file.table.len());
    for entry in file.table {
        if models.iter().any(|m| m.name == entry.name) {
            return Err(ModelFileError::DuplicateTable(entry.name));
        }
        models.push(entry.into());
    }
    Ok(models)
}

/// Read a model file, optionally keeping a single table.
pub fn load(path: &Utf8Path, only: Option<&str>) -> Result<Vec<TableModel>, ModelFileError> {
    let source = std::fs::read_to_string(path).map_err(|source| ModelFileError::Io {
        path: path.to_owned(),
        source,
    })?;
    let models = parse(path, &source)?;
    match only {
        None => Ok(models),
        Some(name) => {
            let model = models
                .into_iter()
                .find(|m| m.name == name)
                .ok_or_else(|| ModelFileError::UnknownTable(name.to_string()))?;
            Ok(vec![model])
        }
    }
}
