//! Schema types for shipshape.
//!
//! Three families of types live here:
//!
//! - the **declared** model ([`TableModel`], [`ColumnDecl`]) and its mapped form
//!   ([`ColumnDescriptor`]), produced by the type mapper,
//! - the **live** state read from the catalog ([`LiveColumn`], [`Constraint`],
//!   [`TableState`]),
//! - the type vocabulary shared by both ([`LogicalType`], [`PgType`]).

use std::fmt;

mod live;
mod model;
mod registry;

pub use live::*;
pub use model::*;
pub use registry::*;

pub use shipshape_sql::{QualifiedName, ReferentialAction};

/// Column types a model can declare.
///
/// This is a closed set: anything a model names that does not resolve to one
/// of these is rejected with [`ModelError::UnsupportedType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// 2-byte integer
    Int16,
    /// 4-byte integer
    Int32,
    /// 8-byte integer
    Int64,
    /// Exact decimal, optionally constrained to `(precision, scale)`
    Decimal(Option<(u16, u16)>),
    /// 4-byte float
    Float32,
    /// 8-byte float
    Float64,
    /// Unbounded text
    Text,
    /// Text with an optional maximum length
    VarChar(Option<u32>),
    Boolean,
    /// Timestamp without time zone
    Timestamp,
    /// Timestamp with time zone
    TimestampTz,
    /// Unique identifier
    Uuid,
}

/// Largest precision Postgres accepts for `NUMERIC(p, s)`.
const MAX_NUMERIC_PRECISION: u16 = 1000;

/// Largest length Postgres accepts for `VARCHAR(n)`.
const MAX_VARCHAR_LENGTH: u32 = 10_485_760;

impl LogicalType {
    /// Resolve a declared type name.
    ///
    /// Accepts both Rust spellings (`i64`, `String`, `bool`, `f64`, `Uuid`) and
    /// SQL spellings (`bigint`, `text`, `numeric(18,2)`, `varchar(255)`,
    /// `timestamptz`). Matching is case-insensitive. Returns `None` for
    /// anything outside the supported set, including malformed or
    /// out-of-range parameters.
    pub fn from_name(name: &str) -> Option<LogicalType> {
        let normalized: String = name
            .trim()
            .to_ascii_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let (base, args) = match normalized.split_once('(') {
            Some((base, rest)) => {
                let args = rest.strip_suffix(')')?;
                (base.trim(), Some(args))
            }
            None => (normalized.as_str(), None),
        };

        match (base, args) {
            ("i16" | "int2" | "int16" | "smallint", None) => Some(LogicalType::Int16),
            ("i32" | "int" | "int4" | "int32" | "integer", None) => Some(LogicalType::Int32),
            ("i64" | "int8" | "int64" | "bigint", None) => Some(LogicalType::Int64),
            ("f32" | "float4" | "float32" | "real", None) => Some(LogicalType::Float32),
            ("f64" | "float8" | "float64" | "double" | "double precision", None) => {
                Some(LogicalType::Float64)
            }
            ("decimal" | "numeric", None) => Some(LogicalType::Decimal(None)),
            ("decimal" | "numeric", Some(args)) => parse_decimal_args(args),
            ("string" | "str" | "&str" | "text", None) => Some(LogicalType::Text),
            ("varchar" | "character varying", None) => Some(LogicalType::VarChar(None)),
            ("varchar" | "character varying", Some(args)) => {
                let length: u32 = args.trim().parse().ok()?;
                LogicalType::VarChar(Some(length)).checked()
            }
            ("bool" | "boolean", None) => Some(LogicalType::Boolean),
            ("timestamp" | "datetime" | "naivedatetime" | "timestamp without time zone", None) => {
                Some(LogicalType::Timestamp)
            }
            (
                "timestamptz" | "zoned" | "datetime<utc>" | "timestamp with time zone",
                None,
            ) => Some(LogicalType::TimestampTz),
            ("uuid", None) => Some(LogicalType::Uuid),
            _ => None,
        }
    }

    /// Whether Postgres accepts this type's parameters: a `VARCHAR` length of
    /// 1 to 10485760, and a `NUMERIC` precision of 1 to 1000 with a scale no
    /// larger than the precision.
    pub fn is_valid(self) -> bool {
        match self {
            LogicalType::VarChar(Some(length)) => (1..=MAX_VARCHAR_LENGTH).contains(&length),
            LogicalType::Decimal(Some((precision, scale))) => {
                (1..=MAX_NUMERIC_PRECISION).contains(&precision) && scale <= precision
            }
            _ => true,
        }
    }

    fn checked(self) -> Option<LogicalType> {
        self.is_valid().then_some(self)
    }
}

fn parse_decimal_args(args: &str) -> Option<LogicalType> {
    let (precision, scale) = match args.split_once(',') {
        Some((p, s)) => (p.trim().parse::<u16>().ok()?, s.trim().parse::<u16>().ok()?),
        None => (args.trim().parse::<u16>().ok()?, 0),
    };
    LogicalType::Decimal(Some((precision, scale))).checked()
}

/// Postgres column types, in canonical form.
///
/// Declared types are mapped into this form by [`map_type`] and live types are
/// normalized into it by [`PgType::from_catalog`], so the two compare with `==`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PgType {
    /// SMALLINT (2 bytes)
    SmallInt,
    /// INTEGER (4 bytes)
    Integer,
    /// BIGINT (8 bytes)
    BigInt,
    /// REAL (4 bytes floating point)
    Real,
    /// DOUBLE PRECISION (8 bytes floating point)
    DoublePrecision,
    /// NUMERIC, optionally NUMERIC(precision, scale)
    Numeric(Option<(u16, u16)>),
    /// TEXT
    Text,
    /// VARCHAR, optionally VARCHAR(length)
    VarChar(Option<u32>),
    /// BOOLEAN
    Boolean,
    /// TIMESTAMP
    Timestamp,
    /// TIMESTAMPTZ
    Timestamptz,
    /// UUID
    Uuid,
    /// Any live type no model can declare, kept as its uppercased catalog name.
    Other(String),
}

impl PgType {
    /// Normalize a type as reported by `information_schema.columns`.
    ///
    /// Timestamps with a fractional-second precision other than the default 6
    /// have no declarable counterpart and come back as `Other("TIMESTAMP(p)")`,
    /// so a declared `TIMESTAMP` still differs from them.
    pub fn from_catalog(
        data_type: &str,
        character_maximum_length: Option<i32>,
        numeric_precision: Option<i32>,
        numeric_scale: Option<i32>,
        datetime_precision: Option<i32>,
    ) -> PgType {
        let data_type = data_type.trim().to_ascii_lowercase();
        match data_type.as_str() {
            "timestamp without time zone" | "timestamp with time zone" => {
                let (base, canonical) = if data_type.ends_with("without time zone") {
                    ("TIMESTAMP", PgType::Timestamp)
                } else {
                    ("TIMESTAMPTZ", PgType::Timestamptz)
                };
                match datetime_precision {
                    None | Some(DEFAULT_TIMESTAMP_PRECISION) => canonical,
                    Some(p) => PgType::Other(format!("{}({})", base, p)),
                }
            }
            _ => Self::from_catalog_name(
                &data_type,
                character_maximum_length,
                numeric_precision,
                numeric_scale,
            ),
        }
    }

    fn from_catalog_name(
        data_type: &str,
        character_maximum_length: Option<i32>,
        numeric_precision: Option<i32>,
        numeric_scale: Option<i32>,
    ) -> PgType {
        match data_type {
            "smallint" => PgType::SmallInt,
            "integer" => PgType::Integer,
            "bigint" => PgType::BigInt,
            "real" => PgType::Real,
            "double precision" => PgType::DoublePrecision,
            "numeric" => {
                let precision = numeric_precision.and_then(|p| u16::try_from(p).ok());
                let scale = numeric_scale.and_then(|s| u16::try_from(s).ok());
                PgType::Numeric(precision.zip(scale))
            }
            "text" => PgType::Text,
            "character varying" => {
                PgType::VarChar(character_maximum_length.and_then(|l| u32::try_from(l).ok()))
            }
            "boolean" => PgType::Boolean,
            "uuid" => PgType::Uuid,
            other => PgType::Other(other.to_ascii_uppercase()),
        }
    }

    /// Whether every value of this type survives conversion to `to` unchanged.
    ///
    /// `false` means the conversion can fail, truncate or round.
    pub fn converts_losslessly_to(&self, to: &PgType) -> bool {
        use PgType::*;
        if self == to {
            return true;
        }
        match (self, to) {
            (SmallInt, Integer | BigInt) | (Integer, BigInt) => true,
            (SmallInt | Integer | BigInt, Numeric(None)) => true,
            (Real, DoublePrecision) => true,
            (Numeric(_), Numeric(None)) => true,
            (Numeric(Some((p1, s1))), Numeric(Some((p2, s2)))) => {
                s2 >= s1 && p2.saturating_sub(*s2) >= p1.saturating_sub(*s1)
            }
            (VarChar(Some(a)), VarChar(Some(b))) => b >= a,
            (VarChar(_), VarChar(None) | Text) => true,
            (Text, VarChar(None)) => true,
            _ => false,
        }
    }
}

/// Fractional-second digits Postgres gives `TIMESTAMP` when none are declared.
const DEFAULT_TIMESTAMP_PRECISION: i32 = 6;

impl fmt::Display for PgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgType::SmallInt => write!(f, "SMALLINT"),
            PgType::Integer => write!(f, "INTEGER"),
            PgType::BigInt => write!(f, "BIGINT"),
            PgType::Real => write!(f, "REAL"),
            PgType::DoublePrecision => write!(f, "DOUBLE PRECISION"),
            PgType::Numeric(None) => write!(f, "NUMERIC"),
            PgType::Numeric(Some((precision, scale))) => {
                write!(f, "NUMERIC({},{})", precision, scale)
            }
            PgType::Text => write!(f, "TEXT"),
            PgType::VarChar(None) => write!(f, "VARCHAR"),
            PgType::VarChar(Some(length)) => write!(f, "VARCHAR({})", length),
            PgType::Boolean => write!(f, "BOOLEAN"),
            PgType::Timestamp => write!(f, "TIMESTAMP"),
            PgType::Timestamptz => write!(f, "TIMESTAMPTZ"),
            PgType::Uuid => write!(f, "UUID"),
            PgType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Map a logical type to its Postgres type.
pub fn map_type(ty: LogicalType) -> PgType {
    match ty {
        LogicalType::Int16 => PgType::SmallInt,
        LogicalType::Int32 => PgType::Integer,
        LogicalType::Int64 => PgType::BigInt,
        LogicalType::Decimal(args) => PgType::Numeric(args),
        LogicalType::Float32 => PgType::Real,
        LogicalType::Float64 => PgType::DoublePrecision,
        LogicalType::Text => PgType::Text,
        LogicalType::VarChar(length) => PgType::VarChar(length),
        LogicalType::Boolean => PgType::Boolean,
        LogicalType::Timestamp => PgType::Timestamp,
        LogicalType::TimestampTz => PgType::Timestamptz,
        LogicalType::Uuid => PgType::Uuid,
    }
}

/// The column clause for a logical type, with nullability always spelled out.
///
/// ```
/// use shipshape_schema::{LogicalType, column_type_sql};
/// assert_eq!(column_type_sql(LogicalType::Int64, false), "BIGINT NOT NULL");
/// assert_eq!(column_type_sql(LogicalType::Text, true), "TEXT NULL");
/// ```
pub fn column_type_sql(ty: LogicalType, nullable: bool) -> String {
    format!("{} {}", map_type(ty), null_clause(nullable))
}

pub(crate) fn null_clause(nullable: bool) -> &'static str {
    if nullable { "NULL" } else { "NOT NULL" }
}

#[cfg(test)]
mod tests;
