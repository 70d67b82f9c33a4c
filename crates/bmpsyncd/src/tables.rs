//! Table name constants and composite key construction for BMP state tables.
//!
//! Key construction is centralized here: any separator or prefix mismatch
//! between the write path and the reset path silently orphans records, so
//! both paths must go through these functions.

/// STATE_DB BGP neighbor session table.
pub const BGP_NEIGHBOR_TABLE: &str = "BGP_NEIGHBOR_TABLE";

/// STATE_DB table for routes received from neighbors (Adj-RIB-In).
pub const BGP_RIB_IN_TABLE: &str = "BGP_RIB_IN_TABLE";

/// STATE_DB table for routes advertised to neighbors (Adj-RIB-Out).
pub const BGP_RIB_OUT_TABLE: &str = "BGP_RIB_OUT_TABLE";

/// Sub-prefix embedded in RIB keys between the NLRI and the neighbor
/// address, e.g. `BGP_RIB_IN_TABLE:10.0.0.0/24:BGP_NEIGHBOR:10.0.0.1`.
pub const BGP_NEIGHBOR_PREFIX: &str = "BGP_NEIGHBOR";

/// Delimiter between composite key components in STATE_DB.
pub const KEY_SEPARATOR: &str = ":";

/// CONFIG_DB entry holding the per-table enablement flags (`BMP|table`).
pub const CFG_BMP_CONFIG_KEY: &str = "BMP|table";

/// Field names in the CONFIG_DB `BMP|table` entry.
pub mod fields {
    pub const BGP_NEIGHBOR_TABLE: &str = "bgp_neighbor_table";
    pub const BGP_RIB_IN_TABLE: &str = "bgp_rib_in_table";
    pub const BGP_RIB_OUT_TABLE: &str = "bgp_rib_out_table";
}

/// Builds the key for a neighbor session record:
/// `<table><sep><neighbor>`.
pub fn neighbor_key(table: &str, neighbor: &str) -> String {
    format!("{table}{KEY_SEPARATOR}{neighbor}")
}

/// Builds the key for a RIB record:
/// `<table><sep><nlri><sep>BGP_NEIGHBOR<sep><neighbor>`.
pub fn rib_key(table: &str, nlri: &str, neighbor: &str) -> String {
    format!(
        "{table}{KEY_SEPARATOR}{nlri}{KEY_SEPARATOR}{BGP_NEIGHBOR_PREFIX}{KEY_SEPARATOR}{neighbor}"
    )
}

/// Match pattern covering every key belonging to a table, for reset
/// enumeration.
pub fn table_pattern(table: &str) -> String {
    format!("{table}*")
}
