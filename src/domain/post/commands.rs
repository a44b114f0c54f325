use serde::{Deserialize, Serialize};

use crate::services::response::ServiceError;

fn require(
	field: &str,
	value: &str,
) -> Result<(), ServiceError> {
	if value.trim().is_empty() {
		return Err(ServiceError::ValidationError(format!("{field} is required")));
	}
	Ok(())
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreatePost {
	pub title: String,
	pub excerpt: String,
	pub content: String,
	/// Falls back to the first loaded category when absent.
	pub category_id: Option<String>,
	pub featured_image: Option<String>,
}

impl CreatePost {
	pub fn validate(&self) -> Result<(), ServiceError> {
		require("Title", &self.title)?;
		require("Excerpt", &self.excerpt)?;
		require("Content", &self.content)
	}
}

/// Row sent to the `posts` table on creation.
#[derive(Debug, Serialize)]
pub(crate) struct NewPost {
	pub title: String,
	pub content: String,
	pub excerpt: String,
	pub featured_image: Option<String>,
	pub author_id: String,
	pub category_id: String,
}

impl NewPost {
	pub(crate) fn new(
		command: CreatePost,
		author_id: String,
		category_id: String,
	) -> Self {
		Self {
			title: command.title,
			content: command.content,
			excerpt: command.excerpt,
			featured_image: command.featured_image.filter(|image| !image.is_empty()),
			author_id,
			category_id,
		}
	}
}

/// Partial update; only the fields that are set are sent.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdatePost {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub excerpt: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub featured_image: Option<String>,
}

impl UpdatePost {
	pub fn title(
		mut self,
		title: impl Into<String>,
	) -> Self {
		self.title = Some(title.into());
		self
	}
	pub fn excerpt(
		mut self,
		excerpt: impl Into<String>,
	) -> Self {
		self.excerpt = Some(excerpt.into());
		self
	}
	pub fn content(
		mut self,
		content: impl Into<String>,
	) -> Self {
		self.content = Some(content.into());
		self
	}
	pub fn category_id(
		mut self,
		category_id: impl Into<String>,
	) -> Self {
		self.category_id = Some(category_id.into());
		self
	}
	pub fn featured_image(
		mut self,
		featured_image: impl Into<String>,
	) -> Self {
		self.featured_image = Some(featured_image.into());
		self
	}

	pub fn is_empty(&self) -> bool {
		self.title.is_none()
			&& self.excerpt.is_none()
			&& self.content.is_none()
			&& self.category_id.is_none()
			&& self.featured_image.is_none()
	}

	pub fn validate(&self) -> Result<(), ServiceError> {
		if self.is_empty() {
			return Err(ServiceError::ValidationError("Nothing to update".to_string()));
		}
		for (field, value) in [("Title", &self.title), ("Excerpt", &self.excerpt), ("Content", &self.content), ("Category", &self.category_id)] {
			if let Some(value) = value {
				require(field, value)?;
			}
		}
		Ok(())
	}
}
