//! Deterministic payloads.

/// `len` bytes where byte `i` is `i % 251`.
///
/// The prime period makes any offset mix-up visible in comparisons.
#[must_use]
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// The slice of [`payload`] covering `start..start + len`.
#[must_use]
pub fn payload_at(start: usize, len: usize) -> Vec<u8> {
    (start..start + len).map(|i| (i % 251) as u8).collect()
}
