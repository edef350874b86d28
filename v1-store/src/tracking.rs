//! Tracking IDs of the form `V1-NNNNNN`

use rand::Rng;

pub const TRACKING_PREFIX: &str = "V1-";
const TRACKING_SPACE: u32 = 1_000_000;

/// Fresh tracking ID from the thread-local RNG. Not checked for uniqueness.
pub fn generate_tracking_id() -> String {
    generate_tracking_id_with(&mut rand::rng())
}

pub fn generate_tracking_id_with<R: Rng>(rng: &mut R) -> String {
    format_tracking_id(rng.random_range(0..TRACKING_SPACE))
}

pub fn format_tracking_id(n: u32) -> String {
    format!("{}{:06}", TRACKING_PREFIX, n % TRACKING_SPACE)
}

/// `V1-` followed by exactly six ASCII digits
pub fn is_tracking_id(s: &str) -> bool {
    s.strip_prefix(TRACKING_PREFIX)
        .is_some_and(|digits| digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_digit()))
}
