//! Remote asset lifecycle
//!
//! A document write and the uploads it references are not atomic. The
//! [`AssetBatch`] keeps track of what a request uploaded and what it
//! replaced, and settles both once the document write is known: on success
//! the replaced assets are released, on failure the new uploads are removed.
//! Cleanup failures never fail the request; they are logged with the
//! storage id so the object can be removed by hand.

use common::storage::{ObjectStorage, StoredAsset};
use tracing::{debug, error, info};

use crate::error::ApiResult;
use crate::extract::UploadedFile;

/// Storage folders, one per kind of asset
pub mod folders {
    pub const AVATARS: &str = "portfolio/avatars";
    pub const RESUMES: &str = "portfolio/resumes";
    pub const PROJECT_BANNERS: &str = "portfolio/project-banners";
    pub const SKILL_ICONS: &str = "portfolio/skill-icons";
    pub const SOFTWARE_APPLICATION_ICONS: &str = "portfolio/software-application-icons";
    pub const EXPERIENCE_BANNERS: &str = "portfolio/experience-banners";
}

/// Uploads and replacements made while handling one request
pub struct AssetBatch<'a> {
    storage: &'a dyn ObjectStorage,
    uploaded: Vec<StoredAsset>,
    replaced: Vec<StoredAsset>,
}

impl<'a> AssetBatch<'a> {
    pub fn new(storage: &'a dyn ObjectStorage) -> Self {
        Self {
            storage,
            uploaded: Vec::new(),
            replaced: Vec::new(),
        }
    }

    /// Upload a received file into `folder`
    ///
    /// When the upload fails, everything uploaded earlier in the batch is
    /// removed before the error is returned.
    pub async fn upload(&mut self, file: &UploadedFile, folder: &str) -> ApiResult<StoredAsset> {
        debug!(
            "Uploading {} ({}) to {}",
            file.file_name,
            file.content_type.as_deref().unwrap_or("unknown type"),
            folder
        );

        match self.storage.upload(file.path(), folder, None).await {
            Ok(asset) => {
                info!("Stored asset {}", asset.storage_id);
                self.uploaded.push(asset.clone());
                Ok(asset)
            }
            Err(e) => {
                self.rollback().await;
                Err(e.into())
            }
        }
    }

    /// Upload `file` and swap it into `slot`, releasing the old asset on commit
    pub async fn replace(
        &mut self,
        slot: &mut StoredAsset,
        file: Option<&UploadedFile>,
        folder: &str,
    ) -> ApiResult<()> {
        if let Some(file) = file {
            let asset = self.upload(file, folder).await?;
            self.replaced.push(std::mem::replace(slot, asset));
        }
        Ok(())
    }

    /// Settle the batch against the outcome of the document write
    pub async fn commit<T>(mut self, outcome: ApiResult<T>) -> ApiResult<T> {
        match outcome {
            Ok(value) => {
                for asset in self.replaced.drain(..) {
                    match self.storage.delete(&asset.storage_id).await {
                        Ok(()) => info!("Released replaced asset {}", asset.storage_id),
                        Err(e) => error!(
                            "Failed to release replaced asset {}: {}",
                            asset.storage_id, e
                        ),
                    }
                }
                Ok(value)
            }
            Err(e) => {
                self.rollback().await;
                Err(e)
            }
        }
    }

    async fn rollback(&mut self) {
        for asset in self.uploaded.drain(..) {
            match self.storage.delete(&asset.storage_id).await {
                Ok(()) => info!("Removed orphaned asset {}", asset.storage_id),
                Err(e) => error!(
                    "Failed to remove orphaned asset {}: {}",
                    asset.storage_id, e
                ),
            }
        }
    }
}

/// Delete an asset whose document is about to be deleted
pub async fn release(storage: &dyn ObjectStorage, asset: &StoredAsset) -> ApiResult<()> {
    storage.delete(&asset.storage_id).await?;
    info!("Deleted asset {}", asset.storage_id);
    Ok(())
}

/// Delete the asset, then run `remove` to delete the document referencing it
///
/// A failed asset delete leaves the document untouched. A failed document
/// delete leaves a reference to a deleted object, logged with its storage id.
pub async fn release_then_remove<F>(
    storage: &dyn ObjectStorage,
    asset: &StoredAsset,
    remove: F,
) -> ApiResult<()>
where
    F: Future<Output = ApiResult<()>>,
{
    release(storage, asset).await?;
    remove.await.inspect_err(|e| {
        error!(
            "Document still references deleted asset {}: {}",
            asset.storage_id, e
        )
    })
}
