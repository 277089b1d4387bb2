/// Attachment file storage
///
/// Uploaded files are written to `<root>/attachments/<filename>`. Every upload
/// gets its own filename: 40 random lowercase alphanumeric characters,
/// followed by the extension of the uploaded name when it has a usable one.
/// Identical content uploaded twice is stored twice, so deleting one task's
/// file never touches a file listed by another task.
///
/// The `attachments/` directory is the public file area; the API serves it
/// read-only.
///
/// # Example
///
/// ```no_run
/// use tasklist_shared::storage::{AttachmentStore, Upload};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = AttachmentStore::new("storage/app/public");
/// store.init().await?;
///
/// let name = store.store(&Upload::new(Some("photo1.jpg".into()), b"...".to_vec())).await?;
/// assert!(name.ends_with(".jpg"));
///
/// store.delete(&name).await?;
/// # Ok(())
/// # }
/// ```

use bytes::Bytes;
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Directory under the storage root that holds attachments
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Largest accepted attachment (2048 KB)
pub const MAX_ATTACHMENT_BYTES: usize = 2048 * 1024;

/// Length of the random part of a filename
const NAME_CHARS: usize = 40;

/// Attempts at finding an unused filename before giving up
const MAX_NAME_ATTEMPTS: usize = 8;

/// Longest extension kept from an uploaded filename
const MAX_EXTENSION_LEN: usize = 10;

/// Error type for attachment storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Filename would escape the attachment directory
    #[error("Invalid attachment filename: {0}")]
    InvalidFilename(String),

    /// Every generated filename was already taken
    #[error("No free attachment filename after {0} attempts")]
    NameExhausted(usize),
}

/// An uploaded file waiting to be stored
#[derive(Debug, Clone)]
pub struct Upload {
    /// Name the client gave the file, if any
    pub original_name: Option<String>,

    /// File content
    pub content: Bytes,
}

impl Upload {
    pub fn new(original_name: Option<String>, content: impl Into<Bytes>) -> Self {
        Self {
            original_name,
            content: content.into(),
        }
    }

    /// Size of the file in bytes
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Extension the stored file keeps, if the uploaded name has a usable one
    pub fn extension(&self) -> Option<String> {
        self.original_name.as_deref().and_then(extension_of)
    }
}

/// Generates a fresh filename for an upload
///
/// # Example
///
/// ```
/// use tasklist_shared::storage::unique_filename;
///
/// let a = unique_filename(Some("txt"));
/// assert!(a.ends_with(".txt"));
/// assert_eq!(a.len(), 40 + ".txt".len());
/// assert_ne!(a, unique_filename(Some("txt")));
/// ```
pub fn unique_filename(extension: Option<&str>) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let stem: String = (0..NAME_CHARS)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    match extension {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

/// Lowercased extension of an uploaded name, if it is short and alphanumeric
fn extension_of(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;

    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}

/// Checks that a filename names a file directly inside the attachment directory
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}

/// Filesystem-backed attachment store
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    /// Creates a store rooted at the public storage directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the attachment directory if needed
    pub async fn init(&self) -> Result<(), StorageError> {
        let dir = self.directory();
        tokio::fs::create_dir_all(&dir).await?;
        info!(path = %dir.display(), "Attachment storage ready");
        Ok(())
    }

    /// Directory holding attachment files
    pub fn directory(&self) -> PathBuf {
        self.root.join(ATTACHMENTS_DIR)
    }

    /// Full path of a stored attachment
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_filename(filename) {
            return Err(StorageError::InvalidFilename(filename.to_string()));
        }
        Ok(self.directory().join(filename))
    }

    /// Whether a stored attachment exists
    pub async fn exists(&self, filename: &str) -> bool {
        match self.path_for(filename) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Stores an upload under a new filename and returns it
    ///
    /// The file is created exclusively, so an existing attachment is never
    /// overwritten.
    pub async fn store(&self, upload: &Upload) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(self.directory()).await?;
        let extension = upload.extension();

        for _ in 0..MAX_NAME_ATTEMPTS {
            let filename = unique_filename(extension.as_deref());
            let path = self.path_for(&filename)?;

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            file.write_all(&upload.content).await?;
            file.flush().await?;

            debug!(filename = %filename, bytes = upload.len(), "Stored attachment");
            return Ok(filename);
        }

        Err(StorageError::NameExhausted(MAX_NAME_ATTEMPTS))
    }

    /// Stores uploads in order and returns their filenames in the same order
    pub async fn store_all(&self, uploads: &[Upload]) -> Result<Vec<String>, StorageError> {
        let mut filenames = Vec::with_capacity(uploads.len());
        for upload in uploads {
            filenames.push(self.store(upload).await?);
        }
        Ok(filenames)
    }

    /// Deletes a stored attachment
    ///
    /// Returns `false` if the file was already gone.
    pub async fn delete(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.path_for(filename)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(filename = %filename, "Deleted attachment");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(filename = %filename, "Attachment already missing");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes every listed attachment, stopping at the first hard failure
    pub async fn delete_all(&self, filenames: &[String]) -> Result<(), StorageError> {
        for filename in filenames {
            self.delete(filename).await?;
        }
        Ok(())
    }
}
