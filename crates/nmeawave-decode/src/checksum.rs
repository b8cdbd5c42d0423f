/// XOR of every byte in `bytes`.
pub fn xor_digest(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}

/// Renders a digest as two lowercase hex digits, zero-padded.
pub fn render_digest(digest: u8) -> String {
    format!("{digest:02x}")
}

/// Checksum of a payload as it appears after the `*` of a frame, in lowercase.
///
/// The empty payload has the digest `00`.
pub fn checksum(payload: impl AsRef<[u8]>) -> String {
    render_digest(xor_digest(payload.as_ref()))
}

/// Renders a complete frame `$<payload>*<CS>` with an upper-case checksum.
pub fn frame(payload: &str) -> String {
    format!("${payload}*{}", checksum(payload).to_ascii_uppercase())
}
