//! Fixed categorical code → label maps.
//!
//! Unrecognized codes pass through unchanged (the sources occasionally carry
//! values outside the documented domain and the report must not lose them),
//! except where a map documents an empty-string miss policy.

/// Small fixed mapping with an explicit miss policy.
pub struct LabelMap {
    entries: &'static [(&'static str, &'static str)],
}

impl LabelMap {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        LabelMap { entries }
    }

    fn get(&self, code: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(key, _)| *key == code)
            .map(|(_, label)| *label)
    }

    /// Map a code to its label; unmapped codes come back unchanged.
    pub fn label_or_input(&self, code: &str) -> String {
        self.get(code).map_or_else(|| code.to_string(), String::from)
    }

    /// Map a code to its label; unmapped codes come back as `""`.
    pub fn label_or_empty(&self, code: &str) -> String {
        self.get(code).unwrap_or("").to_string()
    }
}

/// ZNIEFF species flag (fg_esp).
pub const ZNIEFF_SPECIES_FLAGS: LabelMap = LabelMap::new(&[
    ("A", "Autre espèce"),
    ("E", "Autre espèce à enjeux"),
    ("D", "Déterminante"),
    ("C", "Confidentielle"),
]);

/// ZNIEFF habitat typology flag (FG_TYPO). Miss policy is empty string.
pub const ZNIEFF_HABITAT_FLAGS: LabelMap = LabelMap::new(&[
    ("A", "Autre habitat"),
    ("D", "Déterminant"),
    ("P", "Périphérique"),
]);

/// Natura 2000 protection-type code.
pub const N2000_ZONE_TYPES: LabelMap =
    LabelMap::new(&[("A", "ZPS"), ("B", "pSIC/SIC/ZSC")]);

/// Natura 2000 taxonomic group code.
pub const N2000_TAXGROUPS: LabelMap = LabelMap::new(&[
    ("A", "Amphibiens"),
    ("B", "Oiseaux"),
    ("F", "Poissons"),
    ("I", "Invertébrés"),
    ("M", "Mammifères"),
    ("P", "Plantes"),
    ("R", "Reptiles"),
]);

/// Natura 2000 priority-form flag; keys are compared lower-cased.
pub const N2000_PRIORITY_FORMS: LabelMap =
    LabelMap::new(&[("true", "Oui"), ("false", "Non")]);
