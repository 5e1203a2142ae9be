use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MAX_IMAGES: usize = 5;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Public URL prefix under which stored images are served.
pub const PUBLIC_PREFIX: &str = "uploads";

/// An image part pulled out of a multipart request, not yet written to disk.
#[derive(Debug)]
pub struct PendingImage {
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

pub fn validate_image(image: &PendingImage) -> AppResult<()> {
    let is_image = image
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"));
    if !is_image {
        return Err(AppError::Validation("Only image files are allowed".to_string()));
    }

    if image.data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::Validation(format!(
            "Image exceeds the {} MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }

    Ok(())
}

/// Generated storage name: `<unix millis>-<random>.<original extension>`.
pub fn stored_file_name(original_name: Option<&str>) -> String {
    let ext = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}-{}{}", Utc::now().timestamp_millis(), Uuid::new_v4().simple(), ext)
}

/// Write validated images into `upload_dir`, returning their public references.
pub async fn store_images(upload_dir: &str, images: Vec<PendingImage>) -> AppResult<Vec<String>> {
    if images.is_empty() {
        return Ok(Vec::new());
    }

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {}", e)))?;

    let mut references = Vec::with_capacity(images.len());
    for image in images {
        let file_name = stored_file_name(image.original_name.as_deref());
        let path = Path::new(upload_dir).join(&file_name);

        tokio::fs::write(&path, &image.data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store image: {}", e)))?;

        tracing::debug!(file = %file_name, bytes = image.data.len(), "Stored car image");
        references.push(format!("{}/{}", PUBLIC_PREFIX, file_name));
    }

    Ok(references)
}
