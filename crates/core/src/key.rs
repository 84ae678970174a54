//! Storage key derivation for blob objects.
//!
//! Originals are content-addressed by the SHA-1 of the source URL (not of the
//! image bytes), so re-queuing a URL overwrites the same object. The watified
//! copy reuses the original's file name under its own namespace.

use sha1::{Digest, Sha1};

/// Namespace of archived originals.
pub const ORIGINAL_PREFIX: &str = "original";

/// Namespace of composited results.
pub const WATIFIED_PREFIX: &str = "watified";

/// Object metadata entry holding the source URL of an original.
pub const SOURCE_URL_METADATA: &str = "original_url";

/// Derive the storage file name for a source URL: `<sha1-hex>.jpg`.
#[must_use]
pub fn filename_for_url(url: &str) -> String {
    let digest = Sha1::digest(url.as_bytes());
    format!("{}.jpg", hex::encode(digest))
}

/// Full object key of an original: `original/<filename>`.
#[must_use]
pub fn original_key(filename: &str) -> String {
    format!("{ORIGINAL_PREFIX}/{}", basename(filename))
}

/// Full object key of the watified copy of `key`: `watified/<basename>`.
#[must_use]
pub fn watified_key(key: &str) -> String {
    format!("{WATIFIED_PREFIX}/{}", basename(key))
}

/// Last path segment of an object key.
#[must_use]
pub fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Whether `key` lives in the original namespace.
#[must_use]
pub fn is_original_key(key: &str) -> bool {
    key.strip_prefix(ORIGINAL_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_sha1_of_raw_url() {
        // sha1("http://x/img.jpg")
        assert_eq!(
            filename_for_url("http://x/img.jpg"),
            format!("{}.jpg", hex::encode(Sha1::digest(b"http://x/img.jpg")))
        );
        assert_eq!(
            filename_for_url(""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709.jpg"
        );
    }

    #[test]
    fn filename_is_case_sensitive() {
        assert_ne!(
            filename_for_url("http://x/IMG.jpg"),
            filename_for_url("http://x/img.jpg")
        );
    }

    #[test]
    fn original_and_watified_keys() {
        assert_eq!(original_key("abc.jpg"), "original/abc.jpg");
        assert_eq!(watified_key("original/abc.jpg"), "watified/abc.jpg");
        assert_eq!(watified_key("abc.jpg"), "watified/abc.jpg");
    }

    #[test]
    fn basename_strips_any_prefix() {
        assert_eq!(basename("a/b/c.jpg"), "c.jpg");
        assert_eq!(basename("c.jpg"), "c.jpg");
    }

    #[test]
    fn original_namespace_detection() {
        assert!(is_original_key("original/abc.jpg"));
        assert!(!is_original_key("watified/abc.jpg"));
        assert!(!is_original_key("originals/abc.jpg"));
        assert!(!is_original_key("original/"));
    }
}
