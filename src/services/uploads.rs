//! Apartment picture storage.
//!
//! Files are written under `<uploads_dir>/apartments/` and exposed by the
//! static file service as `/uploads/apartments/<file>`. Data-URL pictures are
//! decoded, shrunk to fit the form's bounds and re-encoded as JPEG. Multipart
//! uploads must decode as an image but are stored as received.

use std::path::PathBuf;
use std::sync::OnceLock;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use regex::Regex;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::i18n;

pub const APARTMENTS_SUBDIR: &str = "apartments";
pub const PUBLIC_PREFIX: &str = "/uploads";
/// Upper bound for an image, before any re-encoding.
pub const MAX_UPLOAD_BYTES: usize = 512_000;
const JPEG_QUALITY: u8 = 85;

/// Box a stored picture must fit in. Aspect ratio is kept and smaller
/// images are never enlarged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBounds {
    pub width: u32,
    pub height: u32,
}

impl ImageBounds {
    pub const CREATE: ImageBounds = ImageBounds {
        width: 1200,
        height: 1200,
    };
    pub const UPDATE: ImageBounds = ImageBounds {
        width: 800,
        height: 600,
    };

    fn fits(&self, image: &DynamicImage) -> bool {
        image.width() <= self.width && image.height() <= self.height
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub filename: String,
    pub path: String,
    pub size: usize,
}

fn data_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^data:image/(jpeg|jpg|png|webp);base64,(.+)$")
            .unwrap_or_else(|e| panic!("data url regex: {e}"))
    })
}

/// File extension for an accepted image content type.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Lowercase ASCII, runs of anything else collapsed to `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "image".to_string()
    } else {
        slug
    }
}

fn check_size(bytes: &[u8]) -> AppResult<()> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::invalid_field(
            "image",
            i18n::t("validation.image_size"),
        ));
    }
    Ok(())
}

fn decode(bytes: &[u8]) -> AppResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| {
        tracing::debug!("Rejected unreadable image: {}", e);
        AppError::invalid_field("image", i18n::t("validation.image_unreadable"))
    })
}

/// Decode, shrink to `bounds` if needed and encode as JPEG.
fn shrink_to_jpeg(bytes: &[u8], bounds: ImageBounds) -> AppResult<Vec<u8>> {
    let mut image = decode(bytes)?;
    if !bounds.fits(&image) {
        image = image.thumbnail(bounds.width, bounds.height);
    }

    // JPEG has no alpha channel.
    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("jpeg encoding failed: {e}")))?;
    Ok(out)
}

async fn run_blocking<T, F>(job: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("image task failed: {e}")))?
}

pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(uploads_dir: &str) -> Self {
        Self {
            root: PathBuf::from(uploads_dir),
        }
    }

    async fn write(&self, filename: &str, bytes: &[u8]) -> AppResult<StoredImage> {
        let dir = self.root.join(APARTMENTS_SUBDIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(filename), bytes).await?;

        tracing::info!("Stored image {} ({} bytes)", filename, bytes.len());
        Ok(StoredImage {
            filename: filename.to_string(),
            path: format!("{PUBLIC_PREFIX}/{APARTMENTS_SUBDIR}/{filename}"),
            size: bytes.len(),
        })
    }

    /// Decode `data:image/<type>;base64,...`, fit it into `bounds` and store
    /// it as `apartment-<uuid>.jpg`.
    pub async fn save_data_url(
        &self,
        data_url: &str,
        bounds: ImageBounds,
    ) -> AppResult<StoredImage> {
        let caps = data_url_regex()
            .captures(data_url.trim())
            .ok_or_else(|| AppError::invalid_field("image", i18n::t("validation.image_format")))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(caps[2].trim())
            .map_err(|_| AppError::invalid_field("image", i18n::t("validation.image_data")))?;
        check_size(&bytes)?;

        let jpeg = run_blocking(move || shrink_to_jpeg(&bytes, bounds)).await?;
        let filename = format!("apartment-{}.jpg", uuid::Uuid::new_v4());
        self.write(&filename, &jpeg).await
    }

    /// Store a multipart upload. The name is derived from the client file
    /// name plus a random suffix.
    pub async fn save_upload(
        &self,
        original_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> AppResult<StoredImage> {
        let ext = content_type
            .and_then(extension_for_content_type)
            .ok_or_else(|| AppError::invalid_field("image", i18n::t("validation.image_type")))?;
        check_size(bytes)?;

        let owned = bytes.to_vec();
        run_blocking(move || decode(&owned).map(|_| ())).await?;

        let stem = original_name
            .map(|n| n.rsplit_once('.').map_or(n, |(stem, _)| stem))
            .unwrap_or("image");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let filename = format!("{}-{}.{}", slugify(stem), &suffix[..13], ext);
        self.write(&filename, bytes).await
    }
}
