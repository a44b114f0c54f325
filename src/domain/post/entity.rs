use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{category::Category, profile::Profile};

/// A post as returned by the listing query. `author`, `category` and
/// `comments` are copies taken when the post was fetched and are not kept in
/// sync with later changes to those rows.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Post {
	pub id: String,
	pub title: String,
	pub content: String,
	pub excerpt: String,
	#[serde(default)]
	pub featured_image: Option<String>,
	pub author_id: String,
	#[serde(default)]
	pub author: Option<Profile>,
	pub category_id: String,
	#[serde(default)]
	pub category: Option<Category>,
	#[serde(default, deserialize_with = "nullable_list")]
	pub comments: Vec<Comment>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Post {
	pub fn comment_count(&self) -> usize {
		self.comments.len()
	}

	/// Whether edit and delete affordances should be offered to `profile_id`.
	pub fn is_authored_by(
		&self,
		profile_id: &str,
	) -> bool {
		self.author_id == profile_id
	}
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Comment {
	pub id: String,
	pub content: String,
	pub author_id: String,
	#[serde(default)]
	pub author: Option<Profile>,
	pub post_id: String,
	pub created_at: DateTime<Utc>,
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<Comment>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Ok(Option::<Vec<Comment>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod test {
	use serde_json::json;

	use super::Post;

	#[test]
	fn test_post_without_embedded_comments() {
		let mut raw = json!({
			"id": "p1",
			"title": "Hello",
			"content": "# Hello\nworld",
			"excerpt": "hi",
			"featured_image": null,
			"author_id": "u1",
			"category_id": "tech",
			"created_at": "2024-01-01T00:00:00.123456+00:00",
			"updated_at": "2024-01-01T00:00:00.123456+00:00",
		});

		let post: Post = serde_json::from_value(raw.clone()).unwrap();
		assert_eq!(post.comment_count(), 0);
		assert!(post.author.is_none());
		assert!(post.is_authored_by("u1"));
		assert!(!post.is_authored_by("u2"));

		raw["comments"] = json!(null);
		let post: Post = serde_json::from_value(raw).unwrap();
		assert!(post.comments.is_empty());
	}
}
