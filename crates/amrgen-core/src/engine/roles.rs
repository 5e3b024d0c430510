//! Edge-label helpers for AMR semantic roles.
//!
//! Labels are stored without the leading colon (`ARG0`, `op1`, `snt2`).

/// Concept of the synthetic root that joins several sentences.
pub const MULTI_SENTENCE: &str = "multi-sentence";

/// Concept marking the questioned element of an interrogative sentence.
pub const AMR_UNKNOWN: &str = "amr-unknown";

/// Roles whose `-of` suffix is part of the role name rather than an inversion.
const OF_ROLES: &[&str] = &["consist-of", "prep-on-behalf-of", "prep-out-of"];

/// Returns the label of the same relation seen from the other endpoint.
///
/// `ARG0` <-> `ARG0-of`, `mod` <-> `domain`; roles that already end in `-of`
/// as part of their name (`consist-of`) are inverted by appending `-of`.
pub fn inverse_label(label: &str) -> String {
    match label {
        "mod" => return "domain".to_string(),
        "domain" => return "mod".to_string(),
        _ => {}
    }
    if OF_ROLES.contains(&label) {
        return format!("{}-of", label);
    }
    match label.strip_suffix("-of") {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => format!("{}-of", label),
    }
}

/// Returns true for the numbered core argument roles (`ARG0`..`ARGn`) and
/// their inverses.
pub fn is_core_role(label: &str) -> bool {
    let base = label.strip_suffix("-of").unwrap_or(label);
    match base.strip_prefix("ARG") {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Parses the index of a numbered role such as `op3` or `snt2`.
pub fn numbered(label: &str, prefix: &str) -> Option<u32> {
    let digits = label.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Index of an `op_k` label.
pub fn op_index(label: &str) -> Option<u32> {
    numbered(label, "op")
}

/// Index of a `snt_k` label.
pub fn snt_index(label: &str) -> Option<u32> {
    numbered(label, "snt")
}

/// Position of a date component in canonical month/day/year order.
pub fn date_rank(label: &str) -> Option<usize> {
    match label {
        "month" => Some(0),
        "day" => Some(1),
        "year" => Some(2),
        _ => None,
    }
}
