//! atelier-gallery: a [`CreationStore`] backed by a plain directory.
//!
//! Each creation occupies two files named after its id:
//!
//! - `<id>.json`: the [`CreationRecord`] metadata
//! - `<id>.<ext>`: the encoded image, extension chosen from its MIME type
//!
//! The image is written before the metadata, so a record that lists
//! always has its payload next to it. Re-saving an id under a different
//! MIME type removes the old payload once the new metadata is in place. Entries whose metadata cannot be
//! parsed or whose payload is missing are skipped with a warning rather
//! than failing the whole listing.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use atelier_core::gallery::{CreationRecord, sort_most_recent_first};
use atelier_core::{Creation, CreationStore, StoreError};
use log::{debug, warn};

const METADATA_EXTENSION: &str = "json";

/// File extension for an image MIME type.
#[must_use]
pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Ids become file names, so only `[A-Za-z0-9_-]` is accepted.
///
/// # Errors
///
/// Returns [`StoreError::InvalidId`] for an empty id or any other
/// character.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    let ok = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_owned()))
    }
}

fn read_record(path: &Path) -> Result<CreationRecord, StoreError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Creations stored as files in one directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!("gallery directory {}", root.display());
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{METADATA_EXTENSION}"))
    }

    fn image_path(&self, id: &str, mime: &str) -> PathBuf {
        self.root.join(format!("{id}.{}", extension_for(mime)))
    }

    fn load(&self, path: &Path) -> Result<Creation, StoreError> {
        let record = read_record(path)?;
        validate_id(&record.id)?;
        let bytes = fs::read(self.image_path(&record.id, &record.mime))?;
        Ok(Creation::from_record(record, bytes))
    }
}

impl CreationStore for DirStore {
    fn save(&mut self, creation: &Creation) -> Result<(), StoreError> {
        validate_id(&creation.id)?;
        let metadata = self.metadata_path(&creation.id);
        let previous = read_record(&metadata).ok();
        let record = creation.record();
        let image = self.image_path(&creation.id, &record.mime);
        fs::write(&image, creation.image.bytes())?;
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&metadata, json)?;
        if let Some(previous) = previous {
            let stale = self.image_path(&creation.id, &previous.mime);
            if stale != image
                && let Err(e) = fs::remove_file(&stale)
                && e.kind() != ErrorKind::NotFound
            {
                return Err(e.into());
            }
        }
        debug!("saved {} ({} bytes)", creation.id, creation.image.bytes().len());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Creation>, StoreError> {
        let mut items = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(METADATA_EXTENSION) {
                continue;
            }
            match self.load(&path) {
                Ok(creation) => items.push(creation),
                Err(e) => warn!("skipping {}: {e}", path.display()),
            }
        }
        sort_most_recent_first(&mut items);
        Ok(items)
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        validate_id(id)?;
        let metadata = self.metadata_path(id);
        let record = match read_record(&metadata) {
            Ok(r) => r,
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_owned()));
            }
            Err(e) => return Err(e),
        };
        fs::remove_file(&metadata)?;
        if let Err(e) = fs::remove_file(self.image_path(id, &record.mime))
            && e.kind() != ErrorKind::NotFound
        {
            return Err(e.into());
        }
        debug!("deleted {id}");
        Ok(())
    }
}
