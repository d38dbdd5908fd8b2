/// Characters rejected by at least one mainstream filesystem. `:` is in the
/// set so titles stay usable on Windows drives and in scp-style tooling.
const FORBIDDEN_CHARS: &[char] = &[':', '?', '<', '>', '|', '*'];

/// Strips filesystem-hostile characters from a raw media title.
///
/// The result is used verbatim in every artifact name of a run, so this must
/// be idempotent: sanitizing an already sanitized title is a no-op.
pub fn sanitize_title(raw: &str) -> String {
    raw.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect()
}
