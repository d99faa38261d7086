use std::collections::HashMap;
use std::sync::OnceLock;

pub(crate) const BATCH_ID: &str = "batch_id";
pub(crate) const SAMPLE_ID: &str = "sample_id";
pub(crate) const COLLECTION_DATE: &str = "collection_date";
pub(crate) const LAB_ID: &str = "lab_id";
pub(crate) const ANALYST: &str = "analyst";

static COLUMN_ALIASES: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

/// Canonical name for an already snake_cased header, if it is a known alias.
pub(crate) fn canonical_column(normalized: &str) -> Option<&'static str> {
    column_aliases().get(normalized).copied()
}

pub(crate) fn is_identity_column(column: &str) -> bool {
    matches!(
        column,
        BATCH_ID | SAMPLE_ID | COLLECTION_DATE | LAB_ID | ANALYST
    )
}

fn column_aliases() -> &'static HashMap<&'static str, &'static str> {
    COLUMN_ALIASES.get_or_init(|| {
        const ALIASES: &[(&str, &str)] = &[
            // Measurements
            ("hmf", "h_m_f"),
            ("hydroxymethylfurfural", "h_m_f"),
            ("diastase", "diastase_activity"),
            ("diastase_number", "diastase_activity"),
            ("moisture_content", "moisture"),
            ("water_content", "moisture"),
            ("p_h", "ph"),
            // Identity
            ("batch", BATCH_ID),
            ("batch_number", BATCH_ID),
            ("sample", SAMPLE_ID),
            ("date", COLLECTION_DATE),
            ("collected_at", COLLECTION_DATE),
            ("lab", LAB_ID),
            ("laboratory", LAB_ID),
        ];

        ALIASES.iter().copied().collect()
    })
}
