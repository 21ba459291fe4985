//! Parsing and formatting of publication timestamps.

use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};

/// Parse a submitted publication date.
///
/// Accepts `YYYY-MM-DD HH:MM[:SS[.ffffff]]` with a space or `T` separator, and
/// RFC 3339 timestamps with an offset. Values without an offset are UTC.
pub fn parse_datetime(input: &str) -> Option<OffsetDateTime> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = trimmed.replacen(' ', "T", 1);
    if let Ok(value) = OffsetDateTime::parse(&normalized, &Rfc3339) {
        return Some(value);
    }

    PrimitiveDateTime::parse(
        &normalized,
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            &normalized,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            &normalized,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        )
    })
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}

/// Value for an `<input type="datetime-local" step="1">` field.
pub fn format_input(value: OffsetDateTime) -> String {
    value
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
        .unwrap_or_default()
}

/// Whether `submitted` is what the editor shows for `stored`.
///
/// The input drops sub-second digits, so an unchanged field must not
/// overwrite the stored timestamp.
pub fn matches_input_precision(stored: OffsetDateTime, submitted: OffsetDateTime) -> bool {
    stored.replace_nanosecond(0).unwrap_or(stored) == submitted
}

/// Human readable date used on post cards and detail pages.
pub fn format_display(value: OffsetDateTime) -> String {
    value
        .format(format_description!(
            "[day padding:none] [month repr:long] [year], [hour]:[minute]"
        ))
        .unwrap_or_default()
}

pub fn format_iso(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_default()
}
