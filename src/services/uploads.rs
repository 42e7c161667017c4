// src/services/uploads.rs

use std::path::{Path, PathBuf};

use axum::extract::Multipart;

use crate::{
    config::{AVATAR_MAX_BYTES, QUESTION_IMAGE_MAX_BYTES},
    error::AppError,
    utils::token::random_file_stem,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Avatar,
    Question,
}

impl ImageKind {
    /// Sub-directory of the upload root, also the URL segment under `/uploads`.
    pub fn dir(&self) -> &'static str {
        match self {
            ImageKind::Avatar => "avatars",
            ImageKind::Question => "questions",
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            ImageKind::Avatar => AVATAR_MAX_BYTES,
            ImageKind::Question => QUESTION_IMAGE_MAX_BYTES,
        }
    }

    /// Multipart field carrying the file.
    pub fn field_name(&self) -> &'static str {
        match self {
            ImageKind::Avatar => "avatar",
            ImageKind::Question => "image",
        }
    }
}

/// An image read from a request, already validated.
#[derive(Debug)]
pub struct UploadedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

fn mime_for_extension(ext: &str) -> Option<(&'static str, &'static str)> {
    match ext {
        "jpg" => Some(("jpg", "image/jpeg")),
        "jpeg" => Some(("jpeg", "image/jpeg")),
        "png" => Some(("png", "image/png")),
        "webp" => Some(("webp", "image/webp")),
        "gif" => Some(("gif", "image/gif")),
        _ => None,
    }
}

/// Checks name, declared content type and size. Returns the normalized extension.
pub fn validate_image(
    file_name: &str,
    content_type: &str,
    size: usize,
    kind: ImageKind,
) -> Result<&'static str, AppError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let (ext, mime) = mime_for_extension(&ext).ok_or_else(|| {
        AppError::InvalidFile(
            "Разрешены только изображения (jpeg, jpg, png, webp, gif)".to_string(),
        )
    })?;

    if !content_type.eq_ignore_ascii_case(mime) {
        return Err(AppError::InvalidFile(
            "Тип файла не соответствует расширению".to_string(),
        ));
    }

    if size == 0 {
        return Err(AppError::InvalidFile("Файл пуст".to_string()));
    }

    if size > kind.max_bytes() {
        return Err(AppError::InvalidFile(format!(
            "Размер файла превышает {} МБ",
            kind.max_bytes() / (1024 * 1024)
        )));
    }

    Ok(ext)
}

/// Pulls the image field for `kind` out of a multipart body, streaming chunks
/// and stopping as soon as the size limit is exceeded.
pub async fn read_image(multipart: &mut Multipart, kind: ImageKind) -> Result<UploadedImage, AppError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Некорректные multipart-данные".to_string()))?
    {
        if field.name() != Some(kind.field_name()) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| AppError::BadRequest("Не удалось прочитать файл".to_string()))?
        {
            if bytes.len() + chunk.len() > kind.max_bytes() {
                return Err(AppError::InvalidFile(format!(
                    "Размер файла превышает {} МБ",
                    kind.max_bytes() / (1024 * 1024)
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        let extension = validate_image(&file_name, &content_type, bytes.len(), kind)?;
        return Ok(UploadedImage { extension, bytes });
    }

    Err(AppError::InvalidFile("Файл не загружен".to_string()))
}

/// Local-disk storage for uploaded images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dirs(&self) -> Result<(), AppError> {
        for kind in [ImageKind::Avatar, ImageKind::Question] {
            tokio::fs::create_dir_all(self.root.join(kind.dir())).await?;
        }
        Ok(())
    }

    /// Writes the image under a fresh random name and returns that name.
    pub async fn save(&self, kind: ImageKind, image: &UploadedImage) -> Result<String, AppError> {
        let dir = self.root.join(kind.dir());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", random_file_stem(), image.extension);
        tokio::fs::write(dir.join(&file_name), &image.bytes).await?;
        Ok(file_name)
    }

    /// Best-effort delete; a missing file is not an error.
    pub async fn remove(&self, kind: ImageKind, file_name: &str) {
        // Stored names never contain separators; ignore anything that does.
        if file_name.contains(['/', '\\']) || file_name.contains("..") {
            return;
        }
        let path = self.root.join(kind.dir()).join(file_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_extension_and_mime() {
        assert_eq!(
            validate_image("photo.JPG", "image/jpeg", 1024, ImageKind::Avatar).unwrap(),
            "jpg"
        );
        assert_eq!(
            validate_image("sign.webp", "image/webp", 10, ImageKind::Question).unwrap(),
            "webp"
        );
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(matches!(
            validate_image("script.exe", "image/png", 10, ImageKind::Avatar),
            Err(AppError::InvalidFile(_))
        ));
        assert!(matches!(
            validate_image("noext", "image/png", 10, ImageKind::Avatar),
            Err(AppError::InvalidFile(_))
        ));
    }

    #[test]
    fn rejects_mismatched_mime() {
        assert!(validate_image("a.png", "image/jpeg", 10, ImageKind::Avatar).is_err());
        assert!(validate_image("a.png", "text/html", 10, ImageKind::Avatar).is_err());
    }

    #[test]
    fn size_limits_depend_on_kind() {
        let three_mb = 3 * 1024 * 1024;
        assert!(validate_image("a.png", "image/png", three_mb, ImageKind::Avatar).is_err());
        assert!(validate_image("a.png", "image/png", three_mb, ImageKind::Question).is_ok());
        assert!(validate_image("a.png", "image/png", 0, ImageKind::Question).is_err());
    }

    #[tokio::test]
    async fn save_and_remove_round_trip() {
        let root = std::env::temp_dir().join(format!("pdd-uploads-{}", random_file_stem()));
        let store = ImageStore::new(&root);
        store.ensure_dirs().await.unwrap();

        let image = UploadedImage {
            extension: "png",
            bytes: vec![1, 2, 3],
        };
        let name = store.save(ImageKind::Avatar, &image).await.unwrap();
        assert_eq!(name.len(), 32 + ".png".len());

        let path = root.join("avatars").join(&name);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), vec![1, 2, 3]);

        store.remove(ImageKind::Avatar, &name).await;
        assert!(!path.exists());
        // second remove is a no-op
        store.remove(ImageKind::Avatar, &name).await;

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
