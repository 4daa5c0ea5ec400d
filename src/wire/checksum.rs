//! Frame checksum (spec §3/§4.1): sum of all header+payload bytes mod 256.

/// Compute the ICSP checksum over every byte preceding the checksum byte
/// itself.
pub fn compute(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}
