use std::collections::BTreeMap;
use std::fmt;

/// Metadata key carrying the caller-supplied source URL.
pub const ORIGINAL_URL: &str = "original-url";
/// Metadata key carrying the HTTP-date the document was created.
pub const CREATED: &str = "created";
/// Metadata key carrying the public URL, stamped by the store.
pub const PUBLISHED_URL: &str = "published-url";

/// String-keyed metadata record attached to every published document.
pub type Metadata = BTreeMap<String, String>;

/// The two kinds of content a document can hold.
///
/// Fixed at creation; a document never changes kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentType {
    Html,
    Json,
}

impl ContentType {
    /// The MIME type served for this kind of content.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
