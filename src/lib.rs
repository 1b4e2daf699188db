//! Export bibliographique biodiversité (ZNIEFF / Natura 2000)
//!
//! Reads the local INPN reference datasets (parquet), filters them on
//! user-supplied zone codes, enriches with cross-reference lookups and
//! writes a four-sheet spreadsheet report:
//! - `codes`: zone code parsing/validation
//! - `data`: dataset registry and projected parquet loading
//! - `filter`: columnar membership filtering
//! - `lookup`: fixed categorical code → label maps
//! - `aggregate`: habitat typology grouping/concatenation
//! - `znieff` / `n2000`: the four exporters
//! - `report`: fixed output schemas and the xlsx writer

pub mod aggregate;
pub mod codes;
pub mod data;
pub mod error;
pub mod filter;
pub mod lookup;
pub mod n2000;
pub mod report;
pub mod znieff;

// Re-export the pipeline surface
pub use codes::{parse_n2000_codes, parse_znieff_codes};
pub use data::InpnPaths;
pub use error::ExportError;
pub use n2000::{export_especes_n2000, export_habitats_n2000};
pub use report::write_excel_output;
pub use znieff::{export_especes_znieff, export_habitats_znieff};
