//! The SPIIR `postcoh` table
//!
//! Post-coherent triggers: one row per coherent candidate across the H1, L1
//! and V1 detectors. `event_id` is the primary key and the only required
//! column.

use std::fmt;

use crate::coerce::Value;
use crate::document::Table;
use crate::errors::LigolwResult;
use crate::schema::{Column, ColumnType, Schema, SchemaRegistry};

/// Registered name of the table
pub const POSTCOH_TABLE: &str = "postcoh";

/// Detectors with per-detector columns
pub const IFOS: [&str; 3] = ["H1", "L1", "V1"];

const COLUMNS: &[(&str, ColumnType)] = &[
    ("process_id", ColumnType::Int8s),
    ("event_id", ColumnType::Int8s),
    ("end_time", ColumnType::Int4s),
    ("end_time_ns", ColumnType::Int4s),
    ("end_time_sngl_H1", ColumnType::Int4s),
    ("end_time_ns_sngl_H1", ColumnType::Int4s),
    ("end_time_sngl_L1", ColumnType::Int4s),
    ("end_time_ns_sngl_L1", ColumnType::Int4s),
    ("end_time_sngl_V1", ColumnType::Int4s),
    ("end_time_ns_sngl_V1", ColumnType::Int4s),
    ("snglsnr_H1", ColumnType::Real4),
    ("snglsnr_L1", ColumnType::Real4),
    ("snglsnr_V1", ColumnType::Real4),
    ("coaphase_L1", ColumnType::Real4),
    ("coaphase_H1", ColumnType::Real4),
    ("coaphase_V1", ColumnType::Real4),
    ("chisq_H1", ColumnType::Real4),
    ("chisq_L1", ColumnType::Real4),
    ("chisq_V1", ColumnType::Real4),
    ("is_background", ColumnType::Int4s),
    ("livetime", ColumnType::Int4s),
    ("ifos", ColumnType::LString),
    ("pivotal_ifo", ColumnType::LString),
    ("tmplt_idx", ColumnType::Int4s),
    ("bankid", ColumnType::Int4s),
    ("pix_idx", ColumnType::Int4s),
    ("cohsnr", ColumnType::Real4),
    ("nullsnr", ColumnType::Real4),
    ("cmbchisq", ColumnType::Real4),
    ("spearman_pval", ColumnType::Real4),
    ("fap", ColumnType::Real4),
    ("far_sngl_H1", ColumnType::Real4),
    ("far_sngl_L1", ColumnType::Real4),
    ("far_sngl_V1", ColumnType::Real4),
    ("far_1w_sngl_H1", ColumnType::Real4),
    ("far_1w_sngl_L1", ColumnType::Real4),
    ("far_1w_sngl_V1", ColumnType::Real4),
    ("far_1d_sngl_H1", ColumnType::Real4),
    ("far_1d_sngl_L1", ColumnType::Real4),
    ("far_1d_sngl_V1", ColumnType::Real4),
    ("far_2h_sngl_H1", ColumnType::Real4),
    ("far_2h_sngl_L1", ColumnType::Real4),
    ("far_2h_sngl_V1", ColumnType::Real4),
    ("far", ColumnType::Real4),
    ("far_2h", ColumnType::Real4),
    ("far_1d", ColumnType::Real4),
    ("far_1w", ColumnType::Real4),
    ("skymap_fname", ColumnType::LString),
    ("template_duration", ColumnType::Real8),
    ("mass1", ColumnType::Real4),
    ("mass2", ColumnType::Real4),
    ("mchirp", ColumnType::Real4),
    ("mtotal", ColumnType::Real4),
    ("spin1x", ColumnType::Real4),
    ("spin1y", ColumnType::Real4),
    ("spin1z", ColumnType::Real4),
    ("spin2x", ColumnType::Real4),
    ("spin2y", ColumnType::Real4),
    ("spin2z", ColumnType::Real4),
    ("eta", ColumnType::Real4),
    ("f_final", ColumnType::Real4),
    ("ra", ColumnType::Real8),
    ("dec", ColumnType::Real8),
    ("deff_H1", ColumnType::Real8),
    ("deff_L1", ColumnType::Real8),
    ("deff_V1", ColumnType::Real8),
    ("rank", ColumnType::Real8),
];

/// Column layout of the `postcoh` table.
pub fn postcoh_schema() -> Schema {
    COLUMNS
        .iter()
        .map(|&(name, column_type)| {
            if name == "event_id" {
                Column::required(name, column_type)
            } else {
                Column::new(name, column_type)
            }
        })
        .collect()
}

/// Registers the `postcoh` table; a no-op if it is already registered.
pub fn register_postcoh(registry: &mut SchemaRegistry) -> LigolwResult<()> {
    registry.register(POSTCOH_TABLE, postcoh_schema())
}

/// A GPS instant split into whole seconds and nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GpsTime {
    pub seconds: i64,
    pub nanoseconds: i64,
}

impl GpsTime {
    pub fn new(seconds: i64, nanoseconds: i64) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.seconds as f64 + self.nanoseconds as f64 * 1e-9
    }
}

impl fmt::Display for GpsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanoseconds)
    }
}

/// Coherent end time of row `row`.
///
/// `None` when both halves are absent; an absent half alone reads as zero.
pub fn end_time(table: &Table, row: usize) -> Option<GpsTime> {
    gps_at(table, row, "end_time", "end_time_ns")
}

/// End time of row `row` as seen by detector `ifo` (`"H1"`, `"L1"`, `"V1"`).
pub fn sngl_end_time(table: &Table, row: usize, ifo: &str) -> Option<GpsTime> {
    let seconds = format!("end_time_sngl_{}", ifo);
    let nanoseconds = format!("end_time_ns_sngl_{}", ifo);
    gps_at(table, row, &seconds, &nanoseconds)
}

fn gps_at(table: &Table, row: usize, seconds: &str, nanoseconds: &str) -> Option<GpsTime> {
    let s = table.get(row, seconds).and_then(Value::as_i64);
    let ns = table.get(row, nanoseconds).and_then(Value::as_i64);
    match (s, ns) {
        (None, None) => None,
        (s, ns) => Some(GpsTime::new(s.unwrap_or(0), ns.unwrap_or(0))),
    }
}
