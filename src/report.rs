//! Fixed output schemas and the spreadsheet writer.
//!
//! Every output table, even empty, carries its full fixed column schema —
//! consumers must never see a missing column. The single
//! [`conform_to_schema`] step enforces presence, order and empty-filling
//! uniformly at the end of each exporter and again in the writer.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use tracing::info;

use crate::error::ExportError;
use crate::filter::string_column;

/// ZNIEFF habitats sheet, final column order.
pub const HABITATS_ZNIEFF_COLS: [&str; 13] = [
    "ID ZNIEFF",
    "Nom ZNIEFF",
    "Type ZNIEFF",
    "Type habitat",
    "CD_HAB",
    "Code typologie",
    "Libellé typologie",
    "Code EUNIS",
    "Libellé EUNIS",
    "Code Corine",
    "Libellé Corine",
    "Code HIC",
    "Libellé HIC",
];

/// ZNIEFF species sheet, final column order.
pub const ESPECES_ZNIEFF_COLS: [&str; 8] = [
    "ID ZNIEFF",
    "Nom ZNIEFF",
    "Type ZNIEFF",
    "Groupe taxonomique",
    "Nom scientifique",
    "CD_REF",
    "CD_NOM",
    "Type espèce",
];

/// Natura 2000 habitats sheet, final column order.
pub const HABITATS_N2000_COLS: [&str; 7] = [
    "ID N2000",
    "Nom site",
    "Type de zone",
    "Code HIC",
    "Libellé HIC",
    "Forme prioritaire",
    "CD_HAB",
];

/// Natura 2000 species sheet, final column order.
pub const ESPECES_N2000_COLS: [&str; 8] = [
    "ID N2000",
    "Nom site",
    "Type de zone",
    "Groupe taxonomique",
    "Nom scientifique",
    "CD_NOM",
    "CD_REF",
    "Type espèce",
];

/// Empty table carrying the full schema (string columns, zero rows).
pub fn empty_table(schema: &[&str]) -> DataFrame {
    let fields = schema
        .iter()
        .map(|&name| Field::new(name.into(), DataType::String));
    DataFrame::empty_with_schema(&Schema::from_iter(fields))
}

/// Complete-and-order post-processing step.
///
/// Missing schema columns are added as `""`, every cell is stringified with
/// nulls mapped to `""`, schema columns come first in order, extra columns
/// are appended after.
pub fn conform_to_schema(df: &DataFrame, schema: &[&str]) -> Result<DataFrame> {
    let present: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    let height = df.height();

    let mut columns: Vec<Column> = Vec::with_capacity(schema.len());
    for &name in schema {
        let values = if present.iter().any(|c| c == name) {
            string_column(df, name)?
        } else {
            vec![String::new(); height]
        };
        columns.push(Column::new(name.into(), values));
    }
    for extra in present.iter().filter(|c| !schema.contains(&c.as_str())) {
        columns.push(Column::new(extra.as_str().into(), string_column(df, extra)?));
    }

    DataFrame::new(columns).context("Failed to assemble schema-conformed table")
}

/// Write the four result tables to one spreadsheet, one sheet per table.
///
/// Fails with `EmptyResultSet` before touching the filesystem when all four
/// tables are empty. Column widths are auto-sized per sheet.
pub fn write_excel_output(
    out_xlsx: &Path,
    habitats_znieff: &DataFrame,
    especes_znieff: &DataFrame,
    habitats_n2000: &DataFrame,
    especes_n2000: &DataFrame,
) -> Result<PathBuf> {
    let sheets: [(&str, DataFrame); 4] = [
        (
            "Habitats ZNIEFF",
            conform_to_schema(habitats_znieff, &HABITATS_ZNIEFF_COLS)?,
        ),
        (
            "Espèces ZNIEFF",
            conform_to_schema(especes_znieff, &ESPECES_ZNIEFF_COLS)?,
        ),
        (
            "Habitats N2000",
            conform_to_schema(habitats_n2000, &HABITATS_N2000_COLS)?,
        ),
        (
            "Espèces N2000",
            conform_to_schema(especes_n2000, &ESPECES_N2000_COLS)?,
        ),
    ];

    if sheets.iter().all(|(_, df)| df.height() == 0) {
        return Err(ExportError::EmptyResultSet.into());
    }

    if let Some(parent) = out_xlsx.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
    }

    let mut workbook = Workbook::new();
    for (sheet_name, df) in &sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*sheet_name)?;

        for (col_idx, &header) in df.get_column_names().iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header.as_str())?;
        }
        for (col_idx, column) in df.get_columns().iter().enumerate() {
            let values = string_column(df, column.name().as_str())?;
            for (row_idx, value) in values.iter().enumerate() {
                worksheet.write_string(row_idx as u32 + 1, col_idx as u16, value)?;
            }
        }
        worksheet.autofit();
        info!(sheet = sheet_name, rows = df.height(), "Sheet written");
    }

    workbook
        .save(out_xlsx)
        .with_context(|| format!("Failed to write {}", out_xlsx.display()))?;

    Ok(out_xlsx.to_path_buf())
}
