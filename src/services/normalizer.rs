/// Minimum admitted length on the one-shot `read_plate` path (length >= 4).
pub const DEMO_MIN_PLATE_LEN: usize = 4;

/// Minimum admitted length on the worker path (length > 4).
///
/// Kept apart from [`DEMO_MIN_PLATE_LEN`]: the two call sites have always
/// admitted fragments differently and nobody has confirmed which is intended.
pub const WORKER_MIN_PLATE_LEN: usize = 5;

/// Uppercase `raw` and keep only `[A-Z0-9]`.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Normalize `raw` and admit it only if at least `min_len` characters remain.
pub fn admit(raw: &str, min_len: usize) -> Option<String> {
    let clean = normalize(raw);
    (clean.len() >= min_len).then_some(clean)
}

/// Concatenate admitted fragments into one plate reading.
///
/// Plates split across two OCR lines ("MH12" / "AB1234") come back whole.
pub fn join_fragments(fragments: &[String]) -> Option<String> {
    (!fragments.is_empty()).then(|| fragments.concat())
}
