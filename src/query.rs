/// Canonicalizes free-text search input before it goes upstream: every
/// character that is not alphanumeric or whitespace becomes a space (so
/// "Spider-Man" matches "Spider Man"), whitespace runs collapse to one
/// space, and the result is trimmed and lowercased. Reapplying it changes
/// nothing unless lowercasing minted a combining mark ('İ' becomes "i"
/// plus U+0307, which only a second pass turns into a space).
pub fn normalize_query(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
