//! The article type shared by the source, the cache and the UI.
//!
//! `Article` is the validated, internal form of one headline.  Sources map
//! their wire payloads into it; the cache stores lists of it as JSON; the UI
//! renders it.  Raw, untyped upstream objects never travel past the source.
//!
//! ## For contributors
//!
//! If you add a field here, remember that cached entries written by older
//! builds will not have it.  Give new fields `#[serde(default)]`, otherwise an
//! old cache entry will fail to decode and the offline fallback will be lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the hex-encoded id, in characters.
const ID_LEN: usize = 16;

/// One headline, normalised from the headlines source.
///
/// ## Identity
///
/// Upstream headlines carry no id of their own, so [`Article::id`] is a
/// content hash of title, source and publish time.  Articles that agree on all
/// three share an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Stable identifier, see [`Article::content_id`].
    pub id: String,

    /// Headline text.
    pub title: String,

    /// Optional summary shown under the headline.
    pub description: Option<String>,

    /// Optional lead image.
    pub image_url: Option<String>,

    /// Link to the full story.
    #[serde(default)]
    pub url: Option<String>,

    /// Publisher identifier (e.g. `"techcrunch"`).
    pub source_id: String,

    /// When the article was published, if the source said.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Build an article, deriving its id from its content.
    pub fn new(
        title: impl Into<String>,
        source_id: impl Into<String>,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        let title = title.into();
        let source_id = source_id.into();
        Self {
            id: Self::content_id(&title, &source_id, published_at.as_ref()),
            title,
            description: None,
            image_url: None,
            url: None,
            source_id,
            published_at,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    /// Hash `(title, source, published_at)` into a short hex id.
    ///
    /// Fields are separated by a NUL byte so that `("ab", "c")` and
    /// `("a", "bc")` hash differently.
    pub fn content_id(title: &str, source_id: &str, published_at: Option<&DateTime<Utc>>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update([0u8]);
        hasher.update(source_id.as_bytes());
        hasher.update([0u8]);
        if let Some(ts) = published_at {
            hasher.update(ts.to_rfc3339().as_bytes());
        }
        let mut id = hex::encode(hasher.finalize());
        id.truncate(ID_LEN);
        id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
