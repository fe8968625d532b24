//! JSON output formatting shared by the manifest and metadata writers.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Serialize `value` with four-space indentation and a trailing newline.
///
/// # Errors
///
/// Returns the serializer error if `value` cannot be represented as JSON.
pub fn to_pretty_bytes<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}
