//! Instance readers and writers.
//!
//! - [`parse_vrplib`] / [`write_vrplib`] — VRPLIB with the `PROFIT_SECTION`
//!   extension
//! - [`parse_legacy`] — the older `C V Q` test-instance format
//! - scalar helpers shared with the solver parameter parsing

mod legacy;
mod numbers;
mod vrplib;

pub use legacy::{parse_legacy, parse_legacy_str};
pub use numbers::{parse_bool, parse_f32, parse_f64, parse_i32, parse_usize};
pub use vrplib::{parse_vrplib, parse_vrplib_str, write_vrplib, write_vrplib_file};

use std::path::Path;

use crate::error::Result;
use crate::models::Instance;

/// Parses an instance file, picking the format from its extension:
/// `.vrp` is VRPLIB, anything else the legacy format.
pub fn parse_instance(path: impl AsRef<Path>) -> Result<Instance> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("vrp") => parse_vrplib(path),
        _ => parse_legacy(path),
    }
}
