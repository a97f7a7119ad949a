use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::gateway::{DocumentGateway, FileGateway, HOTELS_COLLECTION};
use crate::models::{GalleryImage, Hotel};

/// A file picked in the form, held in memory until submit
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl StagedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Typed access to the `hotels` collection and the hotel image folders
#[derive(Clone)]
pub struct HotelRepository {
    documents: Arc<dyn DocumentGateway>,
    files: Arc<dyn FileGateway>,
}

/// Replace every whitespace run with a single `_`.
fn storage_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

pub fn gallery_path(hotel_id: &str, index: usize, file_name: &str) -> String {
    let file_name = storage_file_name(file_name);
    format!("hotels/{hotel_id}/gallery/{hotel_id}_gallery_{index}_{file_name}")
}

pub fn logo_path(hotel_id: &str, file_name: &str) -> String {
    let file_name = storage_file_name(file_name);
    format!("hotels/{hotel_id}/logo/{hotel_id}_logo_{file_name}")
}

fn decode_all(documents: Vec<Value>) -> Vec<Hotel> {
    documents
        .into_iter()
        .filter_map(|doc| match serde_json::from_value::<Hotel>(doc) {
            Ok(hotel) => Some(hotel),
            Err(e) => {
                warn!("Skipping malformed hotel document: {}", e);
                None
            }
        })
        .collect()
}

impl HotelRepository {
    pub fn new(documents: Arc<dyn DocumentGateway>, files: Arc<dyn FileGateway>) -> Self {
        Self { documents, files }
    }

    pub async fn list(&self) -> Result<Vec<Hotel>> {
        let documents = self
            .documents
            .list(HOTELS_COLLECTION)
            .await
            .context("Error fetching hotels")?;
        Ok(decode_all(documents))
    }

    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Hotel>> {
        let documents = self
            .documents
            .find_by(HOTELS_COLLECTION, "createdBy", owner_id)
            .await
            .context("Error fetching hotels")?;
        Ok(decode_all(documents))
    }

    pub async fn get(&self, hotel_id: &str) -> Result<Option<Hotel>> {
        let document = self
            .documents
            .get(HOTELS_COLLECTION, hotel_id)
            .await
            .context("Error fetching hotel")?;

        document
            .map(|doc| serde_json::from_value(doc).context("Malformed hotel document"))
            .transpose()
    }

    pub async fn create(&self, hotel: &Hotel) -> Result<()> {
        let document = serde_json::to_value(hotel)?;
        self.documents
            .set(HOTELS_COLLECTION, &hotel.id, document)
            .await
            .context("Error creating hotel")?;
        info!("Created hotel {} ({})", hotel.name, hotel.id);
        Ok(())
    }

    /// Overwrite the editable fields of an existing hotel. Ownership and
    /// creation time are never rewritten.
    pub async fn update(&self, hotel: &Hotel) -> Result<()> {
        let mut patch = serde_json::to_value(hotel)?;
        if let Some(fields) = patch.as_object_mut() {
            fields.remove("id");
            fields.remove("createdBy");
            fields.remove("createdAt");
        }
        self.documents
            .update(HOTELS_COLLECTION, &hotel.id, patch)
            .await
            .context("Error updating hotel")?;
        info!("Updated hotel {} ({})", hotel.name, hotel.id);
        Ok(())
    }

    pub async fn delete(&self, hotel_id: &str) -> Result<()> {
        if self.get(hotel_id).await?.is_none() {
            bail!("Hotel not found");
        }
        self.documents
            .delete(HOTELS_COLLECTION, hotel_id)
            .await
            .context("Error deleting hotel")?;
        info!("Deleted hotel {}", hotel_id);
        Ok(())
    }

    /// Upload gallery files in order; the file name becomes the image
    /// description.
    pub async fn upload_gallery(&self, files: &[StagedFile], hotel_id: &str) -> Result<Vec<GalleryImage>> {
        let mut images = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            let path = gallery_path(hotel_id, index, &file.name);
            let url = self
                .files
                .upload(&path, file.bytes.clone(), &file.content_type)
                .await
                .with_context(|| format!("Error uploading gallery image {}", file.name))?;
            images.push(GalleryImage {
                url,
                description: Some(file.name.clone()),
            });
        }
        debug!("Uploaded {} gallery images for {}", images.len(), hotel_id);
        Ok(images)
    }

    pub async fn upload_logo(&self, file: &StagedFile, hotel_id: &str) -> Result<String> {
        let path = logo_path(hotel_id, &file.name);
        self.files
            .upload(&path, file.bytes.clone(), &file.content_type)
            .await
            .with_context(|| format!("Error uploading logo {}", file.name))
    }
}
