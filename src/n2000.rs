//! Natura 2000 filtering and export.
//!
//! Site codes are upper-cased before any comparison. The species export
//! unions the "inscribed" and "other" source tables, each tagged with its
//! provenance, before the shared enrichment path runs once.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use polars::prelude::*;
use tracing::info;

use crate::data::{ensure_exists, read_parquet_columns, InpnPaths};
use crate::filter::{filter_df_by_codes, string_column, KeyCase};
use crate::lookup::{N2000_PRIORITY_FORMS, N2000_TAXGROUPS, N2000_ZONE_TYPES};
use crate::report::{
    conform_to_schema, empty_table, ESPECES_N2000_COLS, HABITATS_N2000_COLS,
};

const ESPECES_KEEP_COLS: [&str; 4] = ["sitecode", "cd_nom", "cd_ref", "taxgroup"];

fn has_usable_codes(codes: &[String]) -> bool {
    codes.iter().any(|c| !c.trim().is_empty())
}

/// Load N2000 site metadata: (ID N2000, Nom site, Type de zone), keys
/// upper-cased, protection type remapped, first occurrence wins.
pub fn load_n2000_info(paths: &InpnPaths) -> Result<DataFrame> {
    let df = read_parquet_columns(
        &paths.n2000_infos_generales,
        &["sitecode", "site_name", "type"],
    )?;

    let ids = string_column(&df, "sitecode")?;
    let names = string_column(&df, "site_name")?;
    let types = string_column(&df, "type")?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut out_ids = Vec::new();
    let mut out_names = Vec::new();
    let mut out_types = Vec::new();
    for ((id, name), zone_type) in ids.into_iter().zip(names).zip(types) {
        let id = id.to_uppercase();
        if seen.insert(id.clone()) {
            out_ids.push(id);
            out_names.push(name);
            out_types.push(N2000_ZONE_TYPES.label_or_input(&zone_type));
        }
    }

    Ok(df![
        "ID N2000" => out_ids,
        "Nom site" => out_names,
        "Type de zone" => out_types,
    ]?)
}

/// Export Natura 2000 habitat rows for the requested site codes.
///
/// Joins HABREF on cd_hab for the HIC label and the site metadata for name
/// and zone type; remaps the priority-form flag to Oui/Non.
pub fn export_habitats_n2000(paths: &InpnPaths, codes: &[String]) -> Result<DataFrame> {
    if !has_usable_codes(codes) {
        return Ok(empty_table(&HABITATS_N2000_COLS));
    }

    let source = read_parquet_columns(
        &paths.n2000_habitats,
        &["sitecode", "cd_ue", "cd_hab", "pf"],
    )?;
    let df = filter_df_by_codes(&source, "sitecode", codes, KeyCase::Upper)?;
    info!(rows = df.height(), "N2000 habitats filtered");
    if df.height() == 0 {
        return Ok(empty_table(&HABITATS_N2000_COLS));
    }

    let habitats = df![
        "sitecode" => string_column(&df, "sitecode")?
            .into_iter()
            .map(|s| s.to_uppercase())
            .collect::<Vec<_>>(),
        "cd_ue" => string_column(&df, "cd_ue")?,
        "cd_hab" => string_column(&df, "cd_hab")?,
        "pf" => string_column(&df, "pf")?
            .into_iter()
            .map(|raw| N2000_PRIORITY_FORMS.label_or_input(&raw.to_lowercase()))
            .collect::<Vec<_>>(),
    ]?;

    let habref = read_parquet_columns(&paths.habref, &["CD_HAB", "LB_HAB_FR"])?;
    let habref = df![
        "CD_HAB" => string_column(&habref, "CD_HAB")?,
        "LB_HAB_FR" => string_column(&habref, "LB_HAB_FR")?,
    ]?;

    let joined = habitats.join(
        &habref,
        ["cd_hab"],
        ["CD_HAB"],
        JoinArgs::new(JoinType::Left),
        None,
    )?;

    let infos = load_n2000_info(paths)?;
    let joined = joined.join(
        &infos,
        ["sitecode"],
        ["ID N2000"],
        JoinArgs::new(JoinType::Left),
        None,
    )?;

    let out = joined
        .lazy()
        .select([
            col("sitecode").alias("ID N2000"),
            col("Nom site"),
            col("Type de zone"),
            col("cd_ue").alias("Code HIC"),
            col("LB_HAB_FR").alias("Libellé HIC"),
            col("pf").alias("Forme prioritaire"),
            col("cd_hab").alias("CD_HAB"),
        ])
        .collect()?;

    conform_to_schema(&out, &HABITATS_N2000_COLS)
}

/// Export Natura 2000 species rows for the requested site codes.
///
/// Reads the "inscribed" and "other" species tables, tags each row with its
/// provenance, concatenates, then filters and enriches the union once.
pub fn export_especes_n2000(paths: &InpnPaths, codes: &[String]) -> Result<DataFrame> {
    if !has_usable_codes(codes) {
        return Ok(empty_table(&ESPECES_N2000_COLS));
    }

    ensure_exists(&paths.n2000_especes_inscrites)?;
    ensure_exists(&paths.n2000_especes_autres)?;

    let inscrites = load_tagged_species(&paths.n2000_especes_inscrites, "Espèce inscrite")?;
    let autres = load_tagged_species(&paths.n2000_especes_autres, "Espèce autre")?;
    let combined = inscrites.vstack(&autres)?;

    let df = filter_df_by_codes(&combined, "sitecode", codes, KeyCase::Upper)?;
    info!(rows = df.height(), "N2000 species filtered");
    if df.height() == 0 {
        return Ok(empty_table(&ESPECES_N2000_COLS));
    }

    let taxref = read_parquet_columns(&paths.taxref, &["CD_NOM", "LB_NOM"])?;
    let taxref = df![
        "CD_NOM" => string_column(&taxref, "CD_NOM")?,
        "LB_NOM" => string_column(&taxref, "LB_NOM")?,
    ]?;

    let joined = df.join(
        &taxref,
        ["cd_nom"],
        ["CD_NOM"],
        JoinArgs::new(JoinType::Left),
        None,
    )?;

    let infos = load_n2000_info(paths)?;
    let joined = joined.join(
        &infos,
        ["sitecode"],
        ["ID N2000"],
        JoinArgs::new(JoinType::Left),
        None,
    )?;

    let out = joined
        .lazy()
        .select([
            col("sitecode").alias("ID N2000"),
            col("Nom site"),
            col("Type de zone"),
            col("taxgroup").alias("Groupe taxonomique"),
            col("LB_NOM").alias("Nom scientifique"),
            col("cd_nom").alias("CD_NOM"),
            col("cd_ref").alias("CD_REF"),
            col("Type espèce"),
        ])
        .collect()?;

    conform_to_schema(&out, &ESPECES_N2000_COLS)
}

/// Load one species source table, normalized to text, with its provenance
/// tag in `Type espèce` and the taxgroup remapped to its display label.
fn load_tagged_species(path: &Path, species_type: &str) -> Result<DataFrame> {
    let df = read_parquet_columns(path, &ESPECES_KEEP_COLS)?;
    let height = df.height();

    Ok(df![
        "sitecode" => string_column(&df, "sitecode")?
            .into_iter()
            .map(|s| s.to_uppercase())
            .collect::<Vec<_>>(),
        "cd_nom" => string_column(&df, "cd_nom")?,
        "cd_ref" => string_column(&df, "cd_ref")?,
        "taxgroup" => string_column(&df, "taxgroup")?
            .into_iter()
            .map(|group| N2000_TAXGROUPS.label_or_input(&group))
            .collect::<Vec<_>>(),
        "Type espèce" => vec![species_type.to_string(); height],
    ]?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;

    fn missing_paths() -> InpnPaths {
        InpnPaths::default_layout("no/such/dir")
    }

    #[test]
    fn test_empty_code_list_short_circuits_before_io() {
        let out = export_habitats_n2000(&missing_paths(), &[]).unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.width(), HABITATS_N2000_COLS.len());

        let out = export_especes_n2000(&missing_paths(), &[]).unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.width(), ESPECES_N2000_COLS.len());
    }

    #[test]
    fn test_missing_source_is_hard_failure() {
        let codes = vec!["FR1234567".to_string()];
        let err = export_especes_n2000(&missing_paths(), &codes).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExportError>(),
            Some(ExportError::SourceNotFound(_))
        ));
    }
}
