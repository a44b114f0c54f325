use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::services::response::ServiceError;

/// Converts local image files into data URIs stored inline in `featured_image`.
pub struct FeaturedImage;

impl FeaturedImage {
	pub fn from_bytes(
		bytes: &[u8],
		mime: &str,
	) -> String {
		format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
	}

	pub fn mime_for(path: &Path) -> Result<&'static str, ServiceError> {
		let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
		match extension.as_deref() {
			Some("png") => Ok("image/png"),
			Some("jpg" | "jpeg") => Ok("image/jpeg"),
			Some("gif") => Ok("image/gif"),
			Some("webp") => Ok("image/webp"),
			Some("svg") => Ok("image/svg+xml"),
			_ => Err(ServiceError::ValidationError(format!("{} is not a supported image file", path.display()))),
		}
	}

	pub async fn from_path(path: impl AsRef<Path>) -> Result<String, ServiceError> {
		let path = path.as_ref();
		let mime = Self::mime_for(path)?;
		let bytes = tokio::fs::read(path)
			.await
			.map_err(|err| ServiceError::ValidationError(format!("cannot read {}: {}", path.display(), err)))?;
		Ok(Self::from_bytes(&bytes, mime))
	}
}

#[cfg(test)]
mod test {
	use std::path::Path;

	use super::FeaturedImage;

	#[test]
	fn test_data_uri_encoding() {
		assert_eq!(FeaturedImage::from_bytes(b"GIF89a", "image/gif"), "data:image/gif;base64,R0lGODlh");
	}

	#[test]
	fn test_mime_from_extension() {
		assert_eq!(FeaturedImage::mime_for(Path::new("cover.JPG")).unwrap(), "image/jpeg");
		assert!(FeaturedImage::mime_for(Path::new("notes.txt")).is_err());
		assert!(FeaturedImage::mime_for(Path::new("no_extension")).is_err());
	}

	#[tokio::test]
	async fn test_from_path_reads_file() {
		let path = std::env::temp_dir().join(format!("blogspace-{}.png", uuid::Uuid::new_v4()));
		tokio::fs::write(&path, [0x89, b'P', b'N', b'G']).await.unwrap();

		let uri = FeaturedImage::from_path(&path).await.unwrap();
		tokio::fs::remove_file(&path).await.unwrap();

		assert_eq!(uri, "data:image/png;base64,iVBORw==");
	}
}
