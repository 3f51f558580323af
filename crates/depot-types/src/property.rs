use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// A single constructor-argument value.
///
/// `PropertyValue` is the closed set of shapes an object's construction
/// arguments can take. Scalars, strings, and booleans; sequences of values;
/// rectangular matrices of values; or nothing at all. Conversions between
/// variants are explicit and fallible, with two promotions carried over from
/// spreadsheet-style callers: a scalar converts to a one-element list, and a
/// scalar or list converts to a one-row matrix.
///
/// # Invariants
///
/// - Matrices built through [`PropertyValue::matrix`] or
///   [`PropertyValue::float_matrix`] are rectangular (all rows equal length).
/// - Equality is structural: scalars by value, lists element-wise, matrices
///   cell-wise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyValue {
    /// Missing / not provided.
    Empty,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// String (may denote a handle reference, see [`is_numeric_literal`]).
    Str(String),
    /// Ordered sequence of values.
    List(Vec<PropertyValue>),
    /// Rectangular grid of values.
    Matrix(Vec<Vec<PropertyValue>>),
}

impl PropertyValue {
    /// Variant name used in conversion error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Matrix(_) => "matrix",
        }
    }

    /// Returns `true` for the `Empty` variant.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Build a matrix, verifying that every row has the same length.
    pub fn matrix(rows: Vec<Vec<PropertyValue>>) -> TypeResult<Self> {
        check_rectangular(&rows, |row| row.len())?;
        Ok(Self::Matrix(rows))
    }

    /// Build a float matrix, verifying that every row has the same length.
    pub fn float_matrix(rows: Vec<Vec<f64>>) -> TypeResult<Self> {
        check_rectangular(&rows, |row| row.len())?;
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Self::Float).collect())
            .collect();
        Ok(Self::Matrix(rows))
    }

    // ---------------------------------------------------------------
    // Conversions
    // ---------------------------------------------------------------

    /// The boolean value, if this is a `Bool`.
    pub fn as_bool(&self) -> TypeResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(conversion("bool", other)),
        }
    }

    /// The integer value. A `Float` with no fractional part converts too.
    pub fn as_int(&self) -> TypeResult<i64> {
        match self {
            Self::Int(i) => Ok(*i),
            Self::Float(f)
                if f.is_finite()
                    && f.fract() == 0.0
                    && *f >= i64::MIN as f64
                    && *f <= i64::MAX as f64 =>
            {
                Ok(*f as i64)
            }
            other => Err(conversion("int", other)),
        }
    }

    /// The float value. An `Int` widens losslessly enough for this domain.
    pub fn as_float(&self) -> TypeResult<f64> {
        match self {
            Self::Float(f) => Ok(*f),
            Self::Int(i) => Ok(*i as f64),
            other => Err(conversion("float", other)),
        }
    }

    /// The string value, if this is a `Str`.
    pub fn as_str(&self) -> TypeResult<&str> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(conversion("string", other)),
        }
    }

    /// The contained values, if this is a `List`.
    pub fn as_list(&self) -> TypeResult<&[PropertyValue]> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(conversion("list", other)),
        }
    }

    /// A list of strings. A bare `Str` promotes to a one-element list.
    pub fn as_string_list(&self) -> TypeResult<Vec<String>> {
        match self {
            Self::Str(s) => Ok(vec![s.clone()]),
            Self::List(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<TypeResult<Vec<String>>>()
                .map_err(|_| conversion("list of strings", self)),
            other => Err(conversion("list of strings", other)),
        }
    }

    /// A float matrix. A scalar promotes to 1x1, a list to a single row.
    pub fn as_float_matrix(&self) -> TypeResult<Vec<Vec<f64>>> {
        let mismatch = || conversion("matrix of floats", self);
        match self {
            Self::Int(_) | Self::Float(_) => {
                Ok(vec![vec![self.as_float().map_err(|_| mismatch())?]])
            }
            Self::List(items) => {
                let row = items
                    .iter()
                    .map(|item| item.as_float())
                    .collect::<TypeResult<Vec<f64>>>()
                    .map_err(|_| mismatch())?;
                Ok(vec![row])
            }
            Self::Matrix(rows) => rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| cell.as_float())
                        .collect::<TypeResult<Vec<f64>>>()
                })
                .collect::<TypeResult<Vec<Vec<f64>>>>()
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        }
    }
}

fn conversion(wanted: &'static str, found: &PropertyValue) -> TypeError {
    TypeError::Conversion {
        wanted,
        found: found.kind(),
    }
}

fn check_rectangular<R>(rows: &[R], len: impl Fn(&R) -> usize) -> TypeResult<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let expected = len(first);
    for (row, cells) in rows.iter().enumerate() {
        let actual = len(cells);
        if actual != expected {
            return Err(TypeError::RaggedMatrix {
                row,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Returns `true` if `s` is a numeric literal rather than a handle reference.
///
/// The rule is the float grammar restricted to digit-bearing spellings:
/// `"42"`, `"-1.5"`, and `"3.0e8"` are numbers, while the alphabetic
/// spellings the grammar also accepts (`"inf"`, `"NaN"`) stay usable as
/// handles. Precedent extraction uses this to tell literal string
/// arguments apart from embedded object handles.
pub fn is_numeric_literal(s: &str) -> bool {
    s.parse::<f64>().is_ok() && s.bytes().any(|b| b.is_ascii_digit())
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items.into_iter().map(Self::Str).collect())
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(items: Vec<f64>) -> Self {
        Self::List(items.into_iter().map(Self::Float).collect())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<empty>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Matrix(rows) => {
                f.write_str("[")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", Self::List(row.clone()))?;
                }
                f.write_str("]")
            }
        }
    }
}
