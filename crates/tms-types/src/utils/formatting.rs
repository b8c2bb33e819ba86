//! String formatting utilities.
//!
//! Log lines carry record identifiers and delay durations; these helpers keep
//! them short and consistent across crates.

/// Truncates an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer ids.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

/// Formats a delay given in minutes as `"<h>h <mm>m"`, or `"<m>m"` below one hour.
pub fn format_delay(minutes: i64) -> String {
	let sign = if minutes < 0 { "-" } else { "" };
	let minutes = minutes.unsigned_abs();
	if minutes < 60 {
		format!("{}{}m", sign, minutes)
	} else {
		format!("{}{}h {:02}m", sign, minutes / 60, minutes % 60)
	}
}
