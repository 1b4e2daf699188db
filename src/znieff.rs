//! ZNIEFF filtering and export.
//!
//! Two exporters share the same shape: quick exit on an empty code list,
//! columnar filter on the zone key, enrichment joins, then the fixed output
//! schema. Habitats additionally go through the typology aggregation.

use std::collections::HashSet;

use anyhow::Result;
use polars::prelude::*;
use tracing::info;

use crate::aggregate::aggregate_typology_groups;
use crate::data::{load_flag_lookup, read_parquet_columns, InpnPaths};
use crate::filter::{filter_by_codes, string_column, KeyCase};
use crate::lookup::ZNIEFF_SPECIES_FLAGS;
use crate::report::{
    conform_to_schema, empty_table, ESPECES_ZNIEFF_COLS, HABITATS_ZNIEFF_COLS,
};

const ESPECES_KEY_COL: &str = "nm_sffzn";
const ESPECES_KEEP_COLS: [&str; 5] = ["nm_sffzn", "cd_ref", "cd_nom", "fg_esp", "groupe_taxo"];

const HABITATS_KEY_COL: &str = "NM_SFFZN";
const HABITATS_KEEP_COLS: [&str; 7] = [
    "NM_SFFZN",
    "CD_TYPO",
    "LB_TYPO",
    "CD_HAB",
    "LB_CODE",
    "LB_HAB",
    "ID_TYPO_INFO",
];

fn has_usable_codes(codes: &[String]) -> bool {
    codes.iter().any(|c| !c.trim().is_empty())
}

/// Load ZNIEFF zone metadata: (ID ZNIEFF, Nom ZNIEFF, Type ZNIEFF), one row
/// per zone, first occurrence wins on duplicates.
pub fn load_znieff_info(paths: &InpnPaths) -> Result<DataFrame> {
    let df = read_parquet_columns(
        &paths.znieff_infos_generales,
        &["NM_SFFZN", "LB_ZN", "TY_ZONE"],
    )?;

    let ids = string_column(&df, "NM_SFFZN")?;
    let names = string_column(&df, "LB_ZN")?;
    let types = string_column(&df, "TY_ZONE")?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut out_ids = Vec::new();
    let mut out_names = Vec::new();
    let mut out_types = Vec::new();
    for ((id, name), zone_type) in ids.into_iter().zip(names).zip(types) {
        if seen.insert(id.clone()) {
            out_ids.push(id);
            out_names.push(name);
            out_types.push(zone_type);
        }
    }

    Ok(df![
        "ID ZNIEFF" => out_ids,
        "Nom ZNIEFF" => out_names,
        "Type ZNIEFF" => out_types,
    ]?)
}

/// Export ZNIEFF species rows for the requested zone codes.
///
/// Left-joins TAXREF for the scientific name (unmatched rows survive with an
/// empty name), remaps the species flag, attaches zone metadata, and sorts
/// by taxonomic group then scientific name.
pub fn export_especes_znieff(paths: &InpnPaths, codes: &[String]) -> Result<DataFrame> {
    if !has_usable_codes(codes) {
        return Ok(empty_table(&ESPECES_ZNIEFF_COLS));
    }

    let df = filter_by_codes(
        &paths.znieff_especes,
        ESPECES_KEY_COL,
        &ESPECES_KEEP_COLS,
        codes,
        KeyCase::Exact,
    )?;
    info!(rows = df.height(), "ZNIEFF species filtered");
    if df.height() == 0 {
        return Ok(empty_table(&ESPECES_ZNIEFF_COLS));
    }

    // Normalized join keys and the flag remap, all as trimmed text
    let especes = df![
        "nm_sffzn" => string_column(&df, "nm_sffzn")?,
        "cd_ref" => string_column(&df, "cd_ref")?,
        "cd_nom" => string_column(&df, "cd_nom")?,
        "groupe_taxo" => string_column(&df, "groupe_taxo")?,
        "fg_esp" => string_column(&df, "fg_esp")?
            .into_iter()
            .map(|flag| ZNIEFF_SPECIES_FLAGS.label_or_input(&flag))
            .collect::<Vec<_>>(),
    ]?;

    let taxref = read_parquet_columns(&paths.taxref, &["CD_NOM", "LB_NOM"])?;
    let taxref = df![
        "CD_NOM" => string_column(&taxref, "CD_NOM")?,
        "LB_NOM" => string_column(&taxref, "LB_NOM")?,
    ]?;

    let joined = especes.join(
        &taxref,
        ["cd_nom"],
        ["CD_NOM"],
        JoinArgs::new(JoinType::Left),
        None,
    )?;

    let info = load_znieff_info(paths)?;
    let joined = joined.join(
        &info,
        ["nm_sffzn"],
        ["ID ZNIEFF"],
        JoinArgs::new(JoinType::Left),
        None,
    )?;

    let out = joined
        .lazy()
        .select([
            col("nm_sffzn").alias("ID ZNIEFF"),
            col("Nom ZNIEFF"),
            col("Type ZNIEFF"),
            col("groupe_taxo").alias("Groupe taxonomique"),
            col("LB_NOM").alias("Nom scientifique"),
            col("cd_ref").alias("CD_REF"),
            col("cd_nom").alias("CD_NOM"),
            col("fg_esp").alias("Type espèce"),
        ])
        .sort(
            ["Groupe taxonomique", "Nom scientifique"],
            SortMultipleOptions::default()
                .with_maintain_order(true)
                .with_nulls_last(true),
        )
        .collect()?;

    conform_to_schema(&out, &ESPECES_ZNIEFF_COLS)
}

/// Export ZNIEFF habitat rows for the requested zone codes, one output row
/// per (zone, typology-info) group.
pub fn export_habitats_znieff(paths: &InpnPaths, codes: &[String]) -> Result<DataFrame> {
    if !has_usable_codes(codes) {
        return Ok(empty_table(&HABITATS_ZNIEFF_COLS));
    }

    let df = filter_by_codes(
        &paths.znieff_habitats,
        HABITATS_KEY_COL,
        &HABITATS_KEEP_COLS,
        codes,
        KeyCase::Exact,
    )?;
    info!(rows = df.height(), "ZNIEFF habitats filtered");
    if df.height() == 0 {
        return Ok(empty_table(&HABITATS_ZNIEFF_COLS));
    }

    let flag_lookup =
        load_flag_lookup(&paths.znieff_habitats_info, "ID_TYPO_INFO", "FG_TYPO")?;
    let grouped = aggregate_typology_groups(&df, &flag_lookup)?;
    info!(groups = grouped.height(), "ZNIEFF habitats aggregated");

    let info = load_znieff_info(paths)?;
    let joined = grouped.join(
        &info,
        ["ID ZNIEFF"],
        ["ID ZNIEFF"],
        JoinArgs::new(JoinType::Left),
        None,
    )?;

    // Conform fills and orders; the trailing select drops ID_TYPO_INFO
    let out = conform_to_schema(&joined, &HABITATS_ZNIEFF_COLS)?;
    Ok(out.select(HABITATS_ZNIEFF_COLS)?)
}
