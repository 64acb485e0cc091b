//! SQL building blocks for schema migrations.
//!
//! DDL is built as a typed AST ([`DdlStmt`]) and rendered to a string. Every
//! identifier goes through [`Ident`], so names coming from a model or from the
//! catalog can never break out of their quotes.

use std::fmt;

mod render;
pub use render::*;

mod stmt;
pub use stmt::*;

/// Postgres silently truncates identifiers longer than this (`NAMEDATALEN - 1`).
pub const PG_IDENT_MAX: usize = 63;

/// A PostgreSQL identifier wrapper.
///
/// Display writes the value escaped and quoted with double quotes. Always
/// quotes, so reserved words like `user` or `order` are safe and the exact
/// case of the name is preserved.
///
/// # Example
/// ```
/// use shipshape_sql::Ident;
/// assert_eq!(format!("{}", Ident("user")), "\"user\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.as_ref().replace('"', "\"\""))
    }
}

/// Why a name was rejected as an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier `{0}` is longer than 63 bytes")]
    TooLong(String),

    #[error("identifier `{0}` contains a NUL byte")]
    Nul(String),
}

/// Check that a table or column name can be used verbatim as a Postgres identifier.
///
/// Quoting handles every other character; these are the cases Postgres itself
/// would reject or silently mangle.
pub fn validate_ident(name: &str) -> Result<(), IdentError> {
    if name.is_empty() {
        return Err(IdentError::Empty);
    }
    if name.contains('\0') {
        return Err(IdentError::Nul(name.escape_debug().to_string()));
    }
    if name.len() > PG_IDENT_MAX {
        return Err(IdentError::TooLong(name.to_string()));
    }
    Ok(())
}

/// A schema-qualified table name, rendered as `"schema"."table"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// `schema.name` without quoting, for messages and logs.
    pub fn unquoted(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", Ident(&self.schema), Ident(&self.name))
    }
}

/// Name of the primary key constraint of `table`.
///
/// Follows the Postgres default (`{table}_pkey`) so keys created by hand and
/// keys created by a migration look the same.
///
/// ```
/// assert_eq!(shipshape_sql::primary_key_name("user"), "user_pkey");
/// ```
pub fn primary_key_name(table: &str) -> String {
    bounded_name(table, "pkey")
}

/// Name of a foreign key constraint owned by `table` over `columns`.
///
/// ```
/// assert_eq!(
///     shipshape_sql::foreign_key_name("post", &["author_id"]),
///     "post_author_id_fkey"
/// );
/// ```
pub fn foreign_key_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    bounded_name(&format!("{}_{}", table, cols.join("_")), "fkey")
}

/// `{stem}_{suffix}`, or `{truncated stem}_{hash}_{suffix}` when that would
/// not fit in a Postgres identifier.
///
/// The hash covers the whole stem, so two long names sharing a prefix still
/// get distinct constraint names.
fn bounded_name(stem: &str, suffix: &str) -> String {
    let plain = format!("{}_{}", stem, suffix);
    if plain.len() <= PG_IDENT_MAX {
        return plain;
    }

    let hex = blake3::hash(stem.as_bytes()).to_hex().to_string();
    let hash = &hex[..16];

    // "{stem}_{hash}_{suffix}"
    let overhead = hash.len() + suffix.len() + 2;
    let mut len = PG_IDENT_MAX.saturating_sub(overhead).min(stem.len());
    while len > 0 && !stem.is_char_boundary(len) {
        len -= 1;
    }

    format!("{}_{}_{}", &stem[..len], hash, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ident() {
        assert_eq!(validate_ident("user"), Ok(()));
        assert_eq!(validate_ident("Weird \"name\""), Ok(()));
        assert_eq!(validate_ident(""), Err(IdentError::Empty));
        assert!(matches!(validate_ident("a\0b"), Err(IdentError::Nul(_))));
        assert_eq!(validate_ident(&"x".repeat(63)), Ok(()));
        assert!(matches!(
            validate_ident(&"x".repeat(64)),
            Err(IdentError::TooLong(_))
        ));
    }

    #[test]
    fn test_qualified_name() {
        let name = QualifiedName::new("public", "user");
        assert_eq!(name.to_string(), "\"public\".\"user\"");
    }

    #[test]
    fn test_long_constraint_names_fit() {
        let long_table = "a_table_name_that_is_really_much_too_long_for_postgres_to_keep_whole";
        let pk = primary_key_name(long_table);
        assert!(pk.len() <= PG_IDENT_MAX, "{pk} is {} bytes", pk.len());
        assert!(pk.ends_with("_pkey"));
        assert_eq!(pk, primary_key_name(long_table));

        let fk = foreign_key_name(long_table, &["owner_id"]);
        assert!(fk.len() <= PG_IDENT_MAX);
        assert!(fk.ends_with("_fkey"));
    }

    #[test]
    fn test_long_names_sharing_a_prefix_differ() {
        let prefix = "x".repeat(60);
        let a = primary_key_name(&format!("{prefix}_alpha"));
        let b = primary_key_name(&format!("{prefix}_beta"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let table = "é".repeat(40);
        let pk = primary_key_name(&table);
        assert!(pk.len() <= PG_IDENT_MAX);
        assert!(pk.starts_with('é'));
    }
}
