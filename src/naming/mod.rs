//! Deterministic hashing and naming
//!
//! Every identifier the controller derives from semantic keys is produced
//! here, so that two processes (or two reconciles of the same object) always
//! agree on label values and names.
//!
//! # Keys
//!
//! | Function | Input | Used as |
//! |----------|-------|---------|
//! | [`coordinate_key`] | GAV | `artifact-build-id` label on discovery tasks |
//! | [`source_identity`] | SCM URL, tag, path | `dependency-build-id` label, the dedup key |
//! | [`generate_resource_name`] | GAV | `ArtifactBuild` object name |
//!
//! The content hash is MD5 rendered as 32 lower-case hex characters. It is a
//! lookup key, not a security boundary, and matches the label values written
//! by earlier deployments of the build service.
//!
//! # Examples
//!
//! ```rust
//! use jbs_controller::naming::{generate_resource_name, source_identity};
//!
//! let name = generate_resource_name("org.foo:bar:1.2.3");
//! assert!(name.starts_with("bar.1.2.3-"));
//!
//! let a = source_identity("https://example/repo", "v1", "");
//! let b = source_identity("https://example/repo", "v1", "");
//! assert_eq!(a, b);
//! ```

use crate::constants::{
    DISCOVERY_TASK_NAME_INFIX, GENERATED_NAME_SUFFIX_LEN, RESOURCE_NAME_HASH_LEN,
};
use md5::{Digest, Md5};
use sha1::Sha1;

/// Maximum length of a stored object name.
pub const MAX_NAME_LEN: usize = 253;

/// Longest name derived from an artifact build name: the discovery task's
/// `<abr>-scm-discovery-<suffix>`.
const MAX_DERIVED_SUFFIX_LEN: usize = DISCOVERY_TASK_NAME_INFIX.len() + GENERATED_NAME_SUFFIX_LEN;

/// Longest normalized artifact/version part kept in a generated name.
pub const MAX_NAME_PART_LEN: usize =
    MAX_NAME_LEN - MAX_DERIVED_SUFFIX_LEN - RESOURCE_NAME_HASH_LEN - 1;

/// Hash arbitrary content into a 32-character lower-case hex digest.
#[must_use]
pub fn content_hash(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Label value identifying the discovery task(s) of a coordinate.
#[must_use]
pub fn coordinate_key(gav: &str) -> String {
    content_hash(gav)
}

/// Deduplication key of a source location.
///
/// The three parts are fed to the digest back to back with no separator, so
/// the result equals `content_hash(&format!("{url}{tag}{path}"))`. Existing
/// dependency builds are labelled with exactly this value; adding a separator
/// would orphan all of them.
#[must_use]
pub fn source_identity(url: &str, tag: &str, path: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    hasher.update(tag.as_bytes());
    hasher.update(path.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive a readable, store-safe object name for a GAV.
///
/// Takes everything after the first `:` (artifact and version), collapses
/// each run of non-alphanumeric characters into one `.`, lower-cases it and
/// appends `-` plus the first eight hex characters of the SHA-1 of the full
/// GAV. `org.foo:bar:1.2.3` becomes `bar.1.2.3-<hash>`.
///
/// Only ASCII letters and digits are kept; any other character, including
/// non-ASCII letters, counts as a separator. The readable part is cut to
/// [`MAX_NAME_PART_LEN`] so names derived from the result by appending a
/// generated suffix stay within [`MAX_NAME_LEN`]. The hash covers the whole
/// GAV, so cut names stay distinct.
#[must_use]
pub fn generate_resource_name(gav: &str) -> String {
    let name_part = gav.split_once(':').map_or(gav, |(_, rest)| rest);

    let mut name = String::with_capacity(name_part.len() + RESOURCE_NAME_HASH_LEN + 1);
    let mut last_dot = false;
    for c in name_part.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
            last_dot = false;
        } else if !last_dot {
            name.push('.');
            last_dot = true;
        }
        if name.len() == MAX_NAME_PART_LEN {
            break;
        }
    }

    let digest = hex::encode(Sha1::digest(gav.as_bytes()));
    name.push('-');
    name.push_str(&digest[..RESOURCE_NAME_HASH_LEN]);
    name
}

/// Random lower-case suffix appended to `generateName` prefixes.
#[must_use]
pub fn generated_name_suffix() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..GENERATED_NAME_SUFFIX_LEN].to_string()
}

/// Cut a `generateName` prefix so that prefix plus suffix fits in
/// [`MAX_NAME_LEN`].
#[must_use]
pub fn truncate_generate_name(prefix: &str) -> &str {
    let mut end = prefix.len().min(MAX_NAME_LEN - GENERATED_NAME_SUFFIX_LEN);
    while !prefix.is_char_boundary(end) {
        end -= 1;
    }
    &prefix[..end]
}

/// Whether `name` can be used as a stored object name.
///
/// Names are non-empty, at most [`MAX_NAME_LEN`] characters, and consist of
/// lower-case ASCII letters, digits, `.` and `-`.
#[must_use]
pub fn is_valid_object_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}
