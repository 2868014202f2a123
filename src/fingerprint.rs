use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use sha1::{Digest, Sha1};

/// Content fingerprint used to find an existing copy of a paste.
///
/// Takes the escaped content as stored. SHA-1 is plenty here since a collision
/// only means serving an existing paste for different content.
pub fn fingerprint(escaped_content: &str) -> String {
    URL_SAFE.encode(Sha1::digest(escaped_content.as_bytes()))
}
