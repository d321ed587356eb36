use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

use crate::{
    constants::IMAGE_EXTENSIONS,
    error::{Error, HttpError, TypeError},
};

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Decodes `data:image/<format>;base64,<payload>`.
pub fn decode_data_uri(value: &str) -> Result<DecodedImage, TypeError> {
    let (header, payload) = value
        .split_once(";base64,")
        .ok_or_else(|| TypeError::new("Image must be a base64 encoded data URI"))?;

    let format = header
        .trim()
        .strip_prefix("data:image/")
        .ok_or_else(|| TypeError::new("Image must be a base64 encoded data URI"))?;

    let extension = IMAGE_EXTENSIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(format))
        .map(|(_, extension)| *extension)
        .ok_or_else(|| TypeError::new("Unsupported image format"))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| TypeError::new("Invalid base64 image payload"))?;

    if bytes.is_empty() {
        return Err(TypeError::new("The submitted image is empty"));
    }

    Ok(DecodedImage { extension, bytes })
}

/// Writes the image under `<media_root>/<directory>/` and returns the path
/// relative to the media root.
pub async fn store_image(
    media_root: &Path,
    directory: &str,
    image: &DecodedImage,
) -> Result<String, Error> {
    let relative = format!("{directory}/{}.{}", Uuid::new_v4(), image.extension);
    let target = media_root.join(&relative);

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            log::error!("Failed to create media directory {}: {e}", parent.display());
            HttpError::InternalServerError.default()
        })?;
    }

    tokio::fs::write(&target, &image.bytes).await.map_err(|e| {
        log::error!("Failed to write {}: {e}", target.display());
        HttpError::InternalServerError.default()
    })?;

    log::debug!("Stored {} bytes at {relative}", image.bytes.len());
    Ok(relative)
}

/// Best effort; a missing file is not an error.
pub async fn remove_image(media_root: &Path, relative: &str) {
    if relative.is_empty() || relative.contains("..") {
        return;
    }

    let target = media_root.join(relative);
    if let Err(e) = tokio::fs::remove_file(&target).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {e}", target.display());
        }
    }
}

pub fn media_url(public_url: &str, relative: &str) -> String {
    format!("{}/media/{}", public_url.trim_end_matches('/'), relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_png_data_uri() {
        let image = decode_data_uri(PIXEL).unwrap();

        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn maps_jpeg_to_jpg() {
        let image = decode_data_uri("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(image.extension, "jpg");
    }

    #[test]
    fn rejects_malformed_uris() {
        assert!(decode_data_uri("iVBORw0KGgo=").is_err());
        assert!(decode_data_uri("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(decode_data_uri("data:image/bmp;base64,Qk0=").is_err());
        assert!(decode_data_uri("data:image/png;base64,***").is_err());
        assert!(decode_data_uri("data:image/png;base64,").is_err());
    }

    #[tokio::test]
    async fn stores_and_removes_images() {
        let media = tempfile::tempdir().unwrap();
        let image = decode_data_uri(PIXEL).unwrap();

        let relative = store_image(media.path(), "recipes", &image).await.unwrap();
        assert!(relative.starts_with("recipes/"));
        assert!(relative.ends_with(".png"));
        assert_eq!(std::fs::read(media.path().join(&relative)).unwrap(), image.bytes);

        remove_image(media.path(), &relative).await;
        assert!(!media.path().join(&relative).exists());

        // second removal is silent
        remove_image(media.path(), &relative).await;
    }

    #[test]
    fn builds_media_urls() {
        assert_eq!(
            media_url("http://localhost:8000/", "avatars/a.jpg"),
            "http://localhost:8000/media/avatars/a.jpg"
        );
    }
}
