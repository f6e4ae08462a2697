//! Saved creations and the storage boundary behind them.
//!
//! [`Gallery`] holds the list the user sees. Persistence through a
//! [`CreationStore`] is best effort: a creation is always added to the
//! in-memory list even when saving it fails, and the failure is handed
//! back for the shell to show as a warning.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::types::RasterImage;

/// Requested output aspect ratio of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    pub const ALL: [Self; 5] = [
        Self::Square,
        Self::Landscape,
        Self::Portrait,
        Self::Standard,
        Self::StandardPortrait,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| format!("unknown aspect ratio {s:?} (expected 1:1, 16:9, 9:16, 4:3, or 3:4)"))
    }
}

/// Which model produced a creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelTag {
    /// Text-to-image.
    #[default]
    Imagen,
    /// Image-to-image (editing, combining).
    GeminiFlash,
}

impl fmt::Display for ModelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imagen => f.write_str("imagen"),
            Self::GeminiFlash => f.write_str("gemini-flash"),
        }
    }
}

impl FromStr for ModelTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "imagen" => Ok(Self::Imagen),
            "gemini-flash" => Ok(Self::GeminiFlash),
            other => Err(format!("unknown model {other:?} (expected imagen or gemini-flash)")),
        }
    }
}

/// Metadata of a creation, without the image payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationRecord {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
    pub model: ModelTag,
    pub mime: String,
    pub created_at_ms: u64,
}

/// A saved result: image plus the prompt context that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creation {
    pub id: String,
    pub image: RasterImage,
    pub prompt: String,
    pub styles: Vec<String>,
    pub aspect_ratio: Option<AspectRatio>,
    pub model: ModelTag,
    pub created_at_ms: u64,
}

static LAST_ID_MS: AtomicU64 = AtomicU64::new(0);

/// Milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::SystemTime::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl Creation {
    /// A new creation stamped with the current time and a fresh id.
    #[must_use]
    pub fn new(image: RasterImage, prompt: impl Into<String>, model: ModelTag) -> Self {
        let (id, created_at_ms) = Self::new_id();
        Self {
            id,
            image,
            prompt: prompt.into(),
            styles: Vec::new(),
            aspect_ratio: None,
            model,
            created_at_ms,
        }
    }

    /// `creation-<unix millis>`, strictly increasing within the process
    /// even when called twice in the same millisecond.
    #[must_use]
    pub fn new_id() -> (String, u64) {
        let now = now_ms();
        let mut last = LAST_ID_MS.load(Ordering::Relaxed);
        loop {
            let next = now.max(last.saturating_add(1));
            match LAST_ID_MS.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return (format!("creation-{next}"), next),
                Err(actual) => last = actual,
            }
        }
    }

    #[must_use]
    pub fn with_styles(mut self, styles: Vec<String>) -> Self {
        self.styles = styles;
        self
    }

    #[must_use]
    pub const fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(aspect_ratio);
        self
    }

    /// Metadata for persistence.
    #[must_use]
    pub fn record(&self) -> CreationRecord {
        CreationRecord {
            id: self.id.clone(),
            prompt: self.prompt.clone(),
            styles: self.styles.clone(),
            aspect_ratio: self.aspect_ratio,
            model: self.model,
            mime: self.image.mime().to_owned(),
            created_at_ms: self.created_at_ms,
        }
    }

    /// Reassemble a creation from stored metadata and payload.
    #[must_use]
    pub fn from_record(record: CreationRecord, bytes: Vec<u8>) -> Self {
        Self {
            image: RasterImage::new(bytes, record.mime),
            id: record.id,
            prompt: record.prompt,
            styles: record.styles,
            aspect_ratio: record.aspect_ratio,
            model: record.model,
            created_at_ms: record.created_at_ms,
        }
    }
}

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored metadata is corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid creation id {0:?}")]
    InvalidId(String),

    #[error("no creation with id {0:?}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for creations.
pub trait CreationStore {
    /// Insert or overwrite a creation.
    ///
    /// # Errors
    ///
    /// Implementation-specific [`StoreError`]s.
    fn save(&mut self, creation: &Creation) -> Result<(), StoreError>;

    /// All creations, most recent first.
    ///
    /// # Errors
    ///
    /// Implementation-specific [`StoreError`]s.
    fn list(&self) -> Result<Vec<Creation>, StoreError>;

    /// Remove a creation.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if there is no such id.
    fn delete(&mut self, id: &str) -> Result<(), StoreError>;
}

/// Volatile store, used when no durable storage is available and in
/// tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    items: Vec<Creation>,
}

impl CreationStore for MemoryStore {
    fn save(&mut self, creation: &Creation) -> Result<(), StoreError> {
        self.items.retain(|c| c.id != creation.id);
        self.items.push(creation.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Creation>, StoreError> {
        let mut items = self.items.clone();
        sort_most_recent_first(&mut items);
        Ok(items)
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.items.len();
        self.items.retain(|c| c.id != id);
        if self.items.len() == before {
            return Err(StoreError::NotFound(id.to_owned()));
        }
        Ok(())
    }
}

/// Newest first; ties broken by id, descending.
pub fn sort_most_recent_first(items: &mut [Creation]) {
    items.sort_by(|a, b| {
        b.created_at_ms
            .cmp(&a.created_at_ms)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// The session's list of creations with best-effort persistence.
#[derive(Debug)]
pub struct Gallery<S> {
    store: S,
    items: Vec<Creation>,
}

impl<S: CreationStore> Gallery<S> {
    /// Open a gallery over `store` and load what it holds.
    ///
    /// A store that cannot be read yields an empty gallery plus the
    /// error.
    pub fn open(store: S) -> (Self, Option<StoreError>) {
        let mut gallery = Self {
            store,
            items: Vec::new(),
        };
        let err = gallery.refresh().err();
        (gallery, err)
    }

    /// Reload from the store.
    ///
    /// # Errors
    ///
    /// The store's [`list`](CreationStore::list) error; the in-memory
    /// list is left as it was.
    pub fn refresh(&mut self) -> Result<(), StoreError> {
        self.items = self.store.list()?;
        debug!("gallery loaded {} creations", self.items.len());
        Ok(())
    }

    /// Add a creation at the front of the list and try to persist it.
    ///
    /// The creation is visible whether or not saving succeeded.
    ///
    /// # Errors
    ///
    /// The store's [`save`](CreationStore::save) error.
    pub fn add(&mut self, creation: Creation) -> Result<(), StoreError> {
        let saved = self.store.save(&creation);
        if let Err(e) = &saved {
            warn!("could not persist {}: {e}", creation.id);
        }
        self.items.retain(|c| c.id != creation.id);
        self.items.insert(0, creation);
        saved
    }

    /// Remove a creation from the list and from the store.
    ///
    /// Returns `false` if it was not in the list.
    ///
    /// # Errors
    ///
    /// The store's [`delete`](CreationStore::delete) error, other than
    /// [`StoreError::NotFound`] (already gone is fine).
    pub fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.items.len();
        self.items.retain(|c| c.id != id);
        let removed = self.items.len() != before;
        match self.store.delete(id) {
            Ok(()) | Err(StoreError::NotFound(_)) => Ok(removed),
            Err(e) => {
                warn!("could not delete {id} from storage: {e}");
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn items(&self) -> &[Creation] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Creation> {
        self.items.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}
