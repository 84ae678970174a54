use std::collections::HashMap;

use bytes::Bytes;

/// A write request for a single object.
#[derive(Debug, Clone)]
pub struct PutObject {
    /// Full object key.
    pub key: String,
    /// Object content.
    pub body: Bytes,
    /// MIME content type (e.g. `"image/jpeg"`).
    pub content_type: String,
    /// Whether the object is readable anonymously through its public URL.
    pub public_read: bool,
    /// User metadata attached to the object.
    pub metadata: HashMap<String, String>,
}

impl PutObject {
    /// A private object with no metadata.
    pub fn new(key: impl Into<String>, body: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            body,
            content_type: content_type.into(),
            public_read: false,
            metadata: HashMap::new(),
        }
    }

    /// Make the object publicly readable.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.public_read = true;
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }
}

/// An object read back from storage.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Full object key.
    pub key: String,
    /// Object content.
    pub body: Bytes,
    /// MIME content type, when the backend reports one.
    pub content_type: Option<String>,
    /// User metadata attached to the object.
    pub metadata: HashMap<String, String>,
}

/// Location of an archived original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOriginal {
    /// Full object key (`original/<filename>`).
    pub key: String,
    /// Public URL of the object.
    pub public_url: String,
}
