//! # Typed Coercion
//!
//! One coercion function per value variant, driven by the registry entry's
//! default. Raw values arrive loosely typed from admin forms and the batch
//! command surface; the stored value always matches the entry's declared
//! shape (with the multi-switch exception, see below).

use errors::ConfError;
use fc_core::{RawValue, SettingValue};

use crate::registry::{DefaultEntry, LineFilter};

/// Coerce a raw value against its registry entry.
///
/// Rules, by the entry's default variant:
/// - switch (`Bool`, or `Int` with a multi-switch cardinality): inputs above
///   1 wrap modulo `max + 1`; otherwise loose truthiness applies, with the
///   literal string `"false"` counting as false
/// - `List`: structured lists are sanitized item-wise; text is split on
///   newlines and run through the entry's line filter
/// - `Int`: form-input integer semantics (leading digits, else 0)
/// - `Str`: trimmed, then checked against the entry's length constraint
pub fn coerce(entry: &DefaultEntry, raw: RawValue) -> Result<SettingValue, ConfError> {
    match &entry.default {
        SettingValue::Bool(_) | SettingValue::Int(_) if entry.multi_switch.is_some() => {
            let max = entry.multi_switch.unwrap_or(1);
            let n = raw.to_i64();
            if max >= 1 && n > 1 {
                Ok(SettingValue::Int(n % (max + 1)))
            } else if matches!(entry.default, SettingValue::Bool(_)) {
                Ok(SettingValue::Bool(raw.truthy()))
            } else {
                Ok(SettingValue::Int(i64::from(raw.truthy())))
            }
        }
        SettingValue::Bool(_) => Ok(SettingValue::Bool(raw.truthy())),
        SettingValue::List(_) => Ok(SettingValue::List(match raw {
            RawValue::List(items) => sanitize_items(items, entry.filter),
            RawValue::Str(text) => sanitize_lines(&text, entry.filter),
            RawValue::Int(n) => sanitize_lines(&n.to_string(), entry.filter),
            RawValue::Bool(_) => Vec::new(),
        })),
        SettingValue::Int(_) => Ok(SettingValue::Int(raw.to_i64())),
        SettingValue::Str(_) => {
            let s = match raw {
                RawValue::Str(s) => s,
                RawValue::Int(n) => n.to_string(),
                RawValue::Bool(b) => {
                    if b {
                        "1".to_string()
                    } else {
                        String::new()
                    }
                }
                RawValue::List(items) => items.join("\n"),
            };
            let s = s.trim().to_string();
            check_string(entry, &s).map_err(|err| ConfError::ValidationRejected {
                id: entry.id.to_string(),
                reason: err.to_string(),
            })?;
            Ok(SettingValue::Str(s))
        }
    }
}

fn check_string(entry: &DefaultEntry, s: &str) -> Result<(), validator::ValidationError> {
    if let Some(max) = entry.max_len {
        if s.chars().count() > max {
            let mut err = validator::ValidationError::new("max_len");
            err.message = Some(format!("longer than {max} characters").into());
            return Err(err);
        }
    }
    Ok(())
}

/// Parse newline-delimited text into a filtered list.
pub fn sanitize_lines(text: &str, filter: LineFilter) -> Vec<String> {
    sanitize_items(text.lines().map(str::to_string).collect(), filter)
}

/// Run already-structured list items through the same cleanup pipeline:
/// trim, per-filter transform, drop empties, dedupe preserving order.
pub fn sanitize_items(items: Vec<String>, filter: LineFilter) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let item = item.trim();
        let item = match filter {
            LineFilter::Basic => item.to_string(),
            LineFilter::Uri => strip_origin(item),
        };
        if item.is_empty() {
            continue;
        }
        if seen.insert(item.clone()) {
            out.push(item);
        }
    }
    out
}

/// Drop the scheme and host from an absolute URL, keeping the path part.
/// Relative paths and anchored patterns (`^/foo$`) pass through unchanged.
fn strip_origin(item: &str) -> String {
    if let Some(pos) = item.find("://") {
        let rest = &item[pos + 3..];
        match rest.find('/') {
            Some(slash) => rest[slash..].to_string(),
            None => "/".to_string(),
        }
    } else {
        item.to_string()
    }
}
