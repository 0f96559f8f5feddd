use std::path::{Path, PathBuf};

use actix_multipart::{Field, Multipart};
use campgrounds::{CampgroundError, ListingForm, UploadedFile};
use chrono::Utc;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Largest accepted image.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
/// Largest accepted text field.
pub const MAX_TEXT_BYTES: usize = 64 * 1024;

/// Parsed create/edit form.
#[derive(Debug, Default)]
pub struct ListingSubmission {
    /// `campground[...]` text fields
    pub form: ListingForm,
    /// The `image` file, if one was chosen
    pub image: Option<UploadedFile>,
}

impl ListingSubmission {
    /// Removes the temporary copy of the uploaded file.
    pub async fn discard_upload(self) {
        if let Some(file) = self.image {
            if let Err(e) = tokio::fs::remove_file(&file.path).await {
                log::debug!("Could not remove temp upload {}: {}", file.path.display(), e);
            }
        }
    }
}

fn unreadable(e: impl std::fmt::Display) -> CampgroundError {
    CampgroundError::UploadFailed(format!("Could not read the submitted form: {}", e))
}

/// Reads the multipart form, writing the image to the temp directory.
pub async fn read_listing_submission(
    mut payload: Multipart,
) -> Result<ListingSubmission, CampgroundError> {
    let mut submission = ListingSubmission::default();

    match read_fields(&mut payload, &mut submission).await {
        Ok(()) => Ok(submission),
        Err(e) => {
            submission.discard_upload().await;
            Err(e)
        }
    }
}

async fn read_fields(
    payload: &mut Multipart,
    submission: &mut ListingSubmission,
) -> Result<(), CampgroundError> {
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(unreadable)?;
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "image" => {
                let original_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or_default()
                    .to_string();

                if original_name.is_empty() {
                    drain(&mut field).await?;
                    continue;
                }

                if let Some(path) = store_file(&mut field, &original_name).await? {
                    let file = UploadedFile {
                        original_name,
                        path,
                    };
                    if let Some(previous) = submission.image.replace(file) {
                        let _ = tokio::fs::remove_file(previous.path).await;
                    }
                }
            }
            "campground[name]" => submission.form.name = read_text(&mut field).await?,
            "campground[description]" => {
                submission.form.description = read_text(&mut field).await?
            }
            "campground[location]" => submission.form.location = read_text(&mut field).await?,
            _ => drain(&mut field).await?,
        }
    }

    Ok(())
}

/// Temp path named `<millis>-<uuid>-<original name>`; directory parts are dropped.
fn temp_path(original_name: &str) -> PathBuf {
    let file_name = Path::new(original_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    std::env::temp_dir().join(format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4(),
        file_name
    ))
}

async fn store_file(field: &mut Field, original_name: &str) -> Result<Option<PathBuf>, CampgroundError> {
    let path = temp_path(original_name);
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(unreadable)?;
    let mut written = 0usize;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(unreadable(e));
            }
        };
        written += chunk.len();
        if written > MAX_IMAGE_BYTES {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(CampgroundError::UploadFailed("Image is too large".to_string()));
        }
        if let Err(e) = file.write_all(&chunk).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(unreadable(e));
        }
    }
    file.flush().await.map_err(unreadable)?;

    if written == 0 {
        let _ = tokio::fs::remove_file(&path).await;
        return Ok(None);
    }

    Ok(Some(path))
}

async fn read_text(field: &mut Field) -> Result<String, CampgroundError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(unreadable)?;
        if bytes.len() + chunk.len() > MAX_TEXT_BYTES {
            return Err(CampgroundError::UploadFailed("Form field is too long".to_string()));
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes).map_err(unreadable)
}

async fn drain(field: &mut Field) -> Result<(), CampgroundError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(unreadable)?;
    }
    Ok(())
}
