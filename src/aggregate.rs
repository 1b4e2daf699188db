//! Habitat typology aggregation.
//!
//! A single physical habitat can be classified under several typology
//! families (EUNIS, Corine biotopes, habitats d'intérêt communautaire). The
//! source therefore carries one row per (zone, typology-info, family entry);
//! the report wants one row per (zone, typology-info) with the family
//! entries collapsed into concatenated code/label columns.
//!
//! Rows are processed in source order and groups keep first-seen order. The
//! CD_HAB tie-break is "first valid value in row order", which is not the
//! lexicographic minimum — tests pin this.

use std::collections::BTreeSet;

use anyhow::Result;
use polars::prelude::*;
use rustc_hash::FxHashMap;

use crate::filter::string_column;
use crate::lookup::ZNIEFF_HABITAT_FLAGS;
use crate::report::{empty_table, HABITATS_ZNIEFF_COLS};

/// Typology families tracked with dedicated output columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Eunis,  // typology code 7
    Corine, // typology code 22
    Hic,    // typology code 8
}

/// Classify a raw typology code by stripping leading zeros.
fn classify_family(typology_code: &str) -> Option<Family> {
    match typology_code.trim_start_matches('0') {
        "7" => Some(Family::Eunis),
        "22" => Some(Family::Corine),
        "8" => Some(Family::Hic),
        _ => None,
    }
}

/// Empty cells and the literal "nan" (an artifact of sources converted from
/// CSV through pandas) both count as missing.
fn is_missing(value: &str) -> bool {
    value.is_empty() || value == "nan"
}

#[derive(Default)]
struct FamilyAcc {
    codes: Vec<String>,
    labels: Vec<String>,
}

impl FamilyAcc {
    /// Row-order concatenation, independent per column, no deduplication.
    fn push(&mut self, code: &str, label: &str) {
        if !is_missing(code) {
            self.codes.push(code.to_string());
        }
        if !is_missing(label) {
            self.labels.push(label.to_string());
        }
    }
}

struct GroupAcc {
    zone_id: String,
    typo_info_id: String,
    habitat_code: String,
    typology_codes: BTreeSet<String>,
    typology_labels: BTreeSet<String>,
    eunis: FamilyAcc,
    corine: FamilyAcc,
    hic: FamilyAcc,
}

impl GroupAcc {
    fn new(zone_id: &str, typo_info_id: &str) -> Self {
        GroupAcc {
            zone_id: zone_id.to_string(),
            typo_info_id: typo_info_id.to_string(),
            habitat_code: String::new(),
            typology_codes: BTreeSet::new(),
            typology_labels: BTreeSet::new(),
            eunis: FamilyAcc::default(),
            corine: FamilyAcc::default(),
            hic: FamilyAcc::default(),
        }
    }
}

/// Collapse filtered ZNIEFF habitat rows into one row per
/// (zone, typology-info) group.
///
/// Expects the raw source columns (NM_SFFZN, CD_TYPO, LB_TYPO, CD_HAB,
/// LB_CODE, LB_HAB, ID_TYPO_INFO). Returns business-named columns ready for
/// the zone-info join, plus ID_TYPO_INFO which the exporter drops at the
/// end. `flag_lookup` maps ID_TYPO_INFO to the FG_TYPO flag character.
pub fn aggregate_typology_groups(
    df: &DataFrame,
    flag_lookup: &FxHashMap<String, String>,
) -> Result<DataFrame> {
    if df.height() == 0 {
        return Ok(empty_table(&HABITATS_ZNIEFF_COLS));
    }

    let zone_ids = string_column(df, "NM_SFFZN")?;
    let typo_codes = string_column(df, "CD_TYPO")?;
    let typo_labels = string_column(df, "LB_TYPO")?;
    let habitat_codes = string_column(df, "CD_HAB")?;
    let entry_codes = string_column(df, "LB_CODE")?;
    let entry_labels = string_column(df, "LB_HAB")?;
    let typo_info_ids = string_column(df, "ID_TYPO_INFO")?;

    let mut groups: Vec<GroupAcc> = Vec::new();
    let mut index: FxHashMap<(String, String), usize> = FxHashMap::default();

    for row in 0..df.height() {
        let key = (zone_ids[row].clone(), typo_info_ids[row].clone());
        let group_idx = *index.entry(key).or_insert_with(|| {
            groups.push(GroupAcc::new(&zone_ids[row], &typo_info_ids[row]));
            groups.len() - 1
        });
        let group = &mut groups[group_idx];

        // First valid value in row order wins
        if group.habitat_code.is_empty() && !is_missing(&habitat_codes[row]) {
            group.habitat_code = habitat_codes[row].clone();
        }

        if !is_missing(&typo_codes[row]) {
            group.typology_codes.insert(typo_codes[row].clone());
        }
        if !is_missing(&typo_labels[row]) {
            group.typology_labels.insert(typo_labels[row].clone());
        }

        if let Some(family) = classify_family(&typo_codes[row]) {
            let acc = match family {
                Family::Eunis => &mut group.eunis,
                Family::Corine => &mut group.corine,
                Family::Hic => &mut group.hic,
            };
            acc.push(&entry_codes[row], &entry_labels[row]);
        }
    }

    let mut out_zone = Vec::with_capacity(groups.len());
    let mut out_typo_info = Vec::with_capacity(groups.len());
    let mut out_type = Vec::with_capacity(groups.len());
    let mut out_cd_hab = Vec::with_capacity(groups.len());
    let mut out_typo_codes = Vec::with_capacity(groups.len());
    let mut out_typo_labels = Vec::with_capacity(groups.len());
    let mut out_eunis_codes = Vec::with_capacity(groups.len());
    let mut out_eunis_labels = Vec::with_capacity(groups.len());
    let mut out_corine_codes = Vec::with_capacity(groups.len());
    let mut out_corine_labels = Vec::with_capacity(groups.len());
    let mut out_hic_codes = Vec::with_capacity(groups.len());
    let mut out_hic_labels = Vec::with_capacity(groups.len());

    for group in groups {
        let flag = flag_lookup
            .get(&group.typo_info_id)
            .map(String::as_str)
            .unwrap_or("");
        out_type.push(ZNIEFF_HABITAT_FLAGS.label_or_empty(flag));

        out_zone.push(group.zone_id);
        out_typo_info.push(group.typo_info_id);
        out_cd_hab.push(group.habitat_code);
        out_typo_codes.push(join_set(&group.typology_codes));
        out_typo_labels.push(join_set(&group.typology_labels));
        out_eunis_codes.push(group.eunis.codes.join(" | "));
        out_eunis_labels.push(group.eunis.labels.join(" | "));
        out_corine_codes.push(group.corine.codes.join(" | "));
        out_corine_labels.push(group.corine.labels.join(" | "));
        out_hic_codes.push(group.hic.codes.join(" | "));
        out_hic_labels.push(group.hic.labels.join(" | "));
    }

    Ok(df![
        "ID ZNIEFF" => out_zone,
        "ID_TYPO_INFO" => out_typo_info,
        "Type habitat" => out_type,
        "CD_HAB" => out_cd_hab,
        "Code typologie" => out_typo_codes,
        "Libellé typologie" => out_typo_labels,
        "Code EUNIS" => out_eunis_codes,
        "Libellé EUNIS" => out_eunis_labels,
        "Code Corine" => out_corine_codes,
        "Libellé Corine" => out_corine_labels,
        "Code HIC" => out_hic_codes,
        "Libellé HIC" => out_hic_labels,
    ]?)
}

/// Distinct values, lexicographic order, `;`-joined.
fn join_set(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habitat_df(
        rows: &[(&str, &str, &str, &str, &str, &str, &str)],
    ) -> DataFrame {
        df![
            "NM_SFFZN" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            "CD_TYPO" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            "LB_TYPO" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            "CD_HAB" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            "LB_CODE" => rows.iter().map(|r| r.4).collect::<Vec<_>>(),
            "LB_HAB" => rows.iter().map(|r| r.5).collect::<Vec<_>>(),
            "ID_TYPO_INFO" => rows.iter().map(|r| r.6).collect::<Vec<_>>(),
        ]
        .unwrap()
    }

    fn cell(df: &DataFrame, col: &str, row: usize) -> String {
        string_column(df, col).unwrap()[row].clone()
    }

    #[test]
    fn test_classify_family_strips_leading_zeros() {
        assert_eq!(classify_family("007"), Some(Family::Eunis));
        assert_eq!(classify_family("7"), Some(Family::Eunis));
        assert_eq!(classify_family("22"), Some(Family::Corine));
        assert_eq!(classify_family("022"), Some(Family::Corine));
        assert_eq!(classify_family("08"), Some(Family::Hic));
        assert_eq!(classify_family("99"), None);
        assert_eq!(classify_family(""), None);
    }

    #[test]
    fn test_families_split_into_dedicated_columns() {
        // One habitat classified under EUNIS ("007") and HIC ("08")
        let df = habitat_df(&[
            ("930012345", "007", "EUNIS", "1234", "E1", "Lib1", "T1"),
            ("930012345", "08", "HIC", "1234", "H1", "LibH", "T1"),
        ]);
        let out = aggregate_typology_groups(&df, &FxHashMap::default()).unwrap();

        assert_eq!(out.height(), 1);
        assert_eq!(cell(&out, "Code EUNIS", 0), "E1");
        assert_eq!(cell(&out, "Libellé EUNIS", 0), "Lib1");
        assert_eq!(cell(&out, "Code HIC", 0), "H1");
        assert_eq!(cell(&out, "Libellé HIC", 0), "LibH");
        assert_eq!(cell(&out, "Code Corine", 0), "");
        assert_eq!(cell(&out, "Code typologie", 0), "007;08");
        assert_eq!(cell(&out, "Libellé typologie", 0), "EUNIS;HIC");
    }

    #[test]
    fn test_habitat_code_first_valid_wins_not_lexicographic_min() {
        let df = habitat_df(&[
            ("930012345", "007", "EUNIS", "", "E1", "L1", "T1"),
            ("930012345", "007", "EUNIS", "nan", "E2", "L2", "T1"),
            ("930012345", "08", "HIC", "B", "H1", "L3", "T1"),
            ("930012345", "22", "Corine", "A", "C1", "L4", "T1"),
        ]);
        let out = aggregate_typology_groups(&df, &FxHashMap::default()).unwrap();

        // "B" appears before "A" in row order; the min would be "A"
        assert_eq!(cell(&out, "CD_HAB", 0), "B");
    }

    #[test]
    fn test_family_concatenation_keeps_repeats_in_row_order() {
        let df = habitat_df(&[
            ("930012345", "7", "EUNIS", "1", "E1", "Lib", "T1"),
            ("930012345", "7", "EUNIS", "1", "E2", "", "T1"),
            ("930012345", "7", "EUNIS", "1", "E1", "Lib", "T1"),
        ]);
        let out = aggregate_typology_groups(&df, &FxHashMap::default()).unwrap();

        // No dedup in family columns; labels skip missing entries independently
        assert_eq!(cell(&out, "Code EUNIS", 0), "E1 | E2 | E1");
        assert_eq!(cell(&out, "Libellé EUNIS", 0), "Lib | Lib");
    }

    #[test]
    fn test_untracked_family_feeds_shared_columns_only() {
        let df = habitat_df(&[
            ("930012345", "99", "Typo interne", "42", "X1", "LX", "T1"),
        ]);
        let out = aggregate_typology_groups(&df, &FxHashMap::default()).unwrap();

        assert_eq!(cell(&out, "Code typologie", 0), "99");
        assert_eq!(cell(&out, "CD_HAB", 0), "42");
        assert_eq!(cell(&out, "Code EUNIS", 0), "");
        assert_eq!(cell(&out, "Code Corine", 0), "");
        assert_eq!(cell(&out, "Code HIC", 0), "");
    }

    #[test]
    fn test_groups_keep_first_seen_order_and_split_by_typo_info() {
        let df = habitat_df(&[
            ("930099999", "7", "EUNIS", "9", "E9", "L9", "T2"),
            ("930012345", "7", "EUNIS", "1", "E1", "L1", "T1"),
            ("930099999", "8", "HIC", "9", "H9", "L9", "T2"),
        ]);
        let out = aggregate_typology_groups(&df, &FxHashMap::default()).unwrap();

        assert_eq!(out.height(), 2);
        assert_eq!(cell(&out, "ID ZNIEFF", 0), "930099999");
        assert_eq!(cell(&out, "ID ZNIEFF", 1), "930012345");
    }

    #[test]
    fn test_habitat_type_label_from_flag_lookup() {
        let mut lookup = FxHashMap::default();
        lookup.insert("T1".to_string(), "D".to_string());
        lookup.insert("T2".to_string(), "X".to_string()); // unmapped flag

        let df = habitat_df(&[
            ("930012345", "7", "EUNIS", "1", "E1", "L1", "T1"),
            ("930012345", "7", "EUNIS", "1", "E1", "L1", "T2"),
            ("930012345", "7", "EUNIS", "1", "E1", "L1", "T3"), // no lookup entry
        ]);
        let out = aggregate_typology_groups(&df, &lookup).unwrap();

        assert_eq!(cell(&out, "Type habitat", 0), "Déterminant");
        assert_eq!(cell(&out, "Type habitat", 1), "");
        assert_eq!(cell(&out, "Type habitat", 2), "");
    }

    #[test]
    fn test_empty_input_returns_schema_complete_table() {
        let df = habitat_df(&[]);
        let out = aggregate_typology_groups(&df, &FxHashMap::default()).unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.width(), HABITATS_ZNIEFF_COLS.len());
    }
}
