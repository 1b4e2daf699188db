//! Local INPN dataset registry and loading helpers.
//!
//! All reference tables are parquet files under a single data directory.
//! Loading always projects the needed columns only; a missing file is a hard
//! `SourceNotFound`, never a soft skip.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::ExportError;

/// Paths of the local INPN reference datasets.
#[derive(Debug, Clone)]
pub struct InpnPaths {
    pub znieff_especes: PathBuf,
    pub znieff_habitats: PathBuf,
    pub znieff_habitats_info: PathBuf,
    pub znieff_infos_generales: PathBuf,
    pub taxref: PathBuf,
    pub n2000_habitats: PathBuf,
    pub n2000_especes_inscrites: PathBuf,
    pub n2000_especes_autres: PathBuf,
    pub n2000_infos_generales: PathBuf,
    pub habref: PathBuf,
}

impl InpnPaths {
    /// Standard file layout under a data directory.
    pub fn default_layout(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        InpnPaths {
            znieff_especes: dir.join("ZNIEFF_Especes.parquet"),
            znieff_habitats: dir.join("ZNIEFF_Habitats.parquet"),
            znieff_habitats_info: dir.join("ZNIEFF_Habitats_infos.parquet"),
            znieff_infos_generales: dir.join("ZNIEFF_Infos_generales.parquet"),
            taxref: dir.join("TAXREFv18.parquet"),
            n2000_habitats: dir.join("N2000_Habitats.parquet"),
            n2000_especes_inscrites: dir.join("N2000_Especes_inscrites.parquet"),
            n2000_especes_autres: dir.join("N2000_Especes_autres.parquet"),
            n2000_infos_generales: dir.join("N2000_Infos_generales.parquet"),
            habref: dir.join("HABREF_70.parquet"),
        }
    }
}

/// Fail with `SourceNotFound` if a required reference table is absent.
pub fn ensure_exists(path: &Path) -> Result<(), ExportError> {
    if !path.exists() {
        return Err(ExportError::SourceNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Load only the given columns from a parquet file.
pub fn read_parquet_columns(path: &Path, columns: &[&str]) -> Result<DataFrame> {
    ensure_exists(path)?;

    let col_exprs: Vec<Expr> = columns.iter().map(|&name| col(name)).collect();
    LazyFrame::scan_parquet(path, ScanArgsParquet::default())
        .with_context(|| format!("Failed to scan parquet: {}", path.display()))?
        .select(&col_exprs)
        .collect()
        .with_context(|| format!("Failed to load columns {:?} from {}", columns, path.display()))
}

/// Load a two-column parquet table as a key → value lookup.
///
/// Keys and values are coerced to trimmed strings; rows with an empty key are
/// skipped. Used for the typology flag lookup (ID_TYPO_INFO → FG_TYPO).
pub fn load_flag_lookup(
    path: &Path,
    key_col: &str,
    value_col: &str,
) -> Result<FxHashMap<String, String>> {
    let df = read_parquet_columns(path, &[key_col, value_col])?;

    let keys = crate::filter::string_column(&df, key_col)?;
    let values = crate::filter::string_column(&df, value_col)?;

    let mut map = FxHashMap::default();
    for (key, value) in keys.into_iter().zip(values) {
        if !key.is_empty() {
            map.insert(key, value);
        }
    }
    Ok(map)
}
