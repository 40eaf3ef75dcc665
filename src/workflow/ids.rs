// src/workflow/ids.rs

use sha2::{Digest, Sha256};

/// Generate a deterministic id with a readable prefix, e.g. `wf_a1b2c3d4`.
///
/// The suffix is the first four bytes of the SHA-256 of `content`, hex
/// encoded. Ids are generated once on discovery and persisted back into the
/// workflow file; they are never re-derived for a file that already carries
/// one.
pub fn generate_id(prefix: &str, content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
    format!("{prefix}_{suffix}")
}
