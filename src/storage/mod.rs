//! Media storage module
//!
//! Handles uploaded image and video files kept on local disk.

mod media;

pub use media::{MediaStorage, MediaUpload, StoredMedia, UPLOADS_URL_PREFIX};
