//! Naming conventions that address components without any explicit id system.
//!
//! A type identifier such as `XSendTransactionModal` maps to the tag identifier
//! `x-send-transaction-modal` (used to find its surface node) and to the field
//! name `$sendTransactionModal` (used by the parent to reference the instance).

pub const FIELD_SIGIL: &str = "$";
pub const PLURAL_SUFFIX: &str = "s";

/// `AnyConstructorName` -> `any-constructor-name`.
pub fn type_to_tag_identifier(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len() + 4);
    for (i, ch) in type_name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// `XAnyWidget` -> `$anyWidget`, `Row` -> `$row`.
pub fn type_to_field_name(type_name: &str) -> String {
    field_name_with(type_name, FIELD_SIGIL)
}

pub fn field_name_with(type_name: &str, sigil: &str) -> String {
    let stem = strip_namespace_prefix(type_name);
    let mut chars = stem.chars();
    let mut out = String::with_capacity(sigil.len() + stem.len());
    out.push_str(sigil);
    if let Some(first) = chars.next() {
        out.push(first.to_ascii_lowercase());
        out.push_str(chars.as_str());
    }
    out
}

pub fn repeated_field_name_with(type_name: &str, sigil: &str, suffix: &str) -> String {
    let mut field = field_name_with(type_name, sigil);
    field.push_str(suffix);
    field
}

/// Drops a one-letter namespace prefix: two leading capitals followed by a lowercase letter.
fn strip_namespace_prefix(type_name: &str) -> &str {
    let bytes = type_name.as_bytes();
    let prefixed = bytes.len() >= 3
        && bytes[0].is_ascii_uppercase()
        && bytes[1].is_ascii_uppercase()
        && bytes[2].is_ascii_lowercase();
    if prefixed {
        &type_name[1..]
    } else {
        type_name
    }
}
