//! Columnar filtering against reference tables.
//!
//! The key column is always compared as text: parquet sources converted from
//! heterogeneous CSVs type their identifier columns inconsistently (integer
//! in one file, string in the next).

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::data::read_parquet_columns;

/// Key comparison rule for [`filter_by_codes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCase {
    /// Trimmed, case-sensitive comparison (ZNIEFF digit strings).
    Exact,
    /// Trimmed and upper-cased on both sides (N2000 site codes).
    Upper,
}

impl KeyCase {
    fn normalize(self, value: &str) -> String {
        match self {
            KeyCase::Exact => value.trim().to_string(),
            KeyCase::Upper => value.trim().to_uppercase(),
        }
    }
}

/// Load only `keep_cols` from a parquet file, then keep the rows whose
/// `key_col` (as text) is one of `codes`.
///
/// Returns a possibly-empty DataFrame; callers short-circuit to an empty,
/// schema-complete output when either the code list or the result is empty.
pub fn filter_by_codes(
    path: &Path,
    key_col: &str,
    keep_cols: &[&str],
    codes: &[String],
    key_case: KeyCase,
) -> Result<DataFrame> {
    let df = read_parquet_columns(path, keep_cols)?;
    filter_df_by_codes(&df, key_col, codes, key_case)
}

/// In-memory variant of [`filter_by_codes`], shared by the exporters that
/// concatenate several tables before filtering.
pub fn filter_df_by_codes(
    df: &DataFrame,
    key_col: &str,
    codes: &[String],
    key_case: KeyCase,
) -> Result<DataFrame> {
    let code_set: HashSet<String> = codes
        .iter()
        .map(|c| key_case.normalize(c))
        .filter(|c| !c.is_empty())
        .collect();

    let keys = df
        .column(key_col)
        .with_context(|| format!("Missing key column '{}'", key_col))?
        .cast(&DataType::String)
        .with_context(|| format!("Cannot compare column '{}' as text", key_col))?;
    let keys = keys.str()?;

    let mask: BooleanChunked = keys
        .into_iter()
        .map(|opt| opt.is_some_and(|s| code_set.contains(&key_case.normalize(s))))
        .collect();

    df.filter(&mask)
        .with_context(|| format!("Failed to filter on '{}'", key_col))
}

/// Extract a column as trimmed strings, nulls mapped to `""`.
///
/// Casts through text first so numeric identifier columns come out as their
/// digit strings.
pub fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .with_context(|| format!("Missing column '{}'", name))?
        .cast(&DataType::String)
        .with_context(|| format!("Cannot read column '{}' as text", name))?;
    let values = column.str()?;

    Ok(values
        .into_iter()
        .map(|opt| opt.map_or_else(String::new, |s| s.trim().to_string()))
        .collect())
}
