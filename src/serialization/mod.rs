//! Helpers for persisting rankings as `word,frequency` records or JSON.

pub mod csv;

pub use self::csv::{read_csv, write_csv};

use crate::error::Result;
use crate::rank::RankedEntry;

/// Renders a ranking as a JSON array of `{"word", "frequency"}` objects.
pub fn to_json(entries: &[RankedEntry], pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(entries)?
    } else {
        serde_json::to_string(entries)?
    };
    Ok(json)
}
