//! Block-length policy (spec §4.1): B grows with √L so the number of
//! blocks stays sub-linear in the basis file size, floored at ~700 bytes.

/// Minimum block length, regardless of file size.
pub const BLOCK_LENGTH_FLOOR: u32 = 700;

/// Chooses the block length for a basis file of `file_len` bytes.
#[must_use]
pub fn block_length(file_len: u64) -> u32 {
    if file_len == 0 {
        return BLOCK_LENGTH_FLOOR;
    }
    // sqrt(L) grows the block count sub-linearly: doubling the file only
    // grows the block count by ~sqrt(2), not 2x.
    let scaled = (file_len as f64).sqrt().round() as u64;
    scaled.max(u64::from(BLOCK_LENGTH_FLOOR)).min(u64::from(u32::MAX)) as u32
}
