/// Maximum identifier length PostgreSQL keeps without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Returns true if `name` is an unquoted SQL identifier, optionally
/// schema-qualified (`schema.table`).
///
/// Configured table, view and probe names are interpolated into SQL text, so
/// anything outside this shape is rejected instead of being quoted.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut parts = name.split('.');
    let valid = parts.by_ref().take(2).all(is_plain_part);
    valid && parts.next().is_none() && !name.is_empty()
}

fn is_plain_part(part: &str) -> bool {
    let mut chars = part.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    part.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
