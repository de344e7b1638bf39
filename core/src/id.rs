//! Random identifier minting.
//!
//! Batch, inventory and lot identifiers all share one scheme: six bytes from
//! the operating system's CSPRNG, encoded as URL-safe base64. Six bytes encode
//! to exactly eight characters with no padding, so every identifier has the
//! same length.
//!
//! The three identifier spaces are not distinguished by prefix or format.
//! Callers rely only on collision rarity (48 bits per identifier).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::RngCore;
use rand::rngs::OsRng;

/// Number of random bytes drawn per identifier.
pub const ID_BYTES: usize = 6;

/// Length of an encoded identifier.
pub const ID_LEN: usize = 8;

/// Mint a fresh random identifier.
///
/// Never fails: if the random source reports an error the failure is logged
/// and whatever is in the buffer is encoded anyway.
///
/// # Examples
///
/// ```
/// use octomuffin_core::id::{random_id, ID_LEN};
///
/// let batch = random_id();
/// assert_eq!(batch.len(), ID_LEN);
/// ```
#[must_use]
pub fn random_id() -> String {
    let mut token = [0u8; ID_BYTES];
    if let Err(e) = OsRng.try_fill_bytes(&mut token) {
        tracing::warn!(error = %e, "random source failed, identifier may not be unique");
    }
    encode_id(token)
}

/// Encode raw identifier bytes the way [`random_id`] does.
#[must_use]
pub fn encode_id(token: [u8; ID_BYTES]) -> String {
    URL_SAFE.encode(token)
}
