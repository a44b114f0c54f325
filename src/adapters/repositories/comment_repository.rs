use serde_json::json;

use crate::{
	adapters::backend::{Embed, Table},
	domain::post::Comment,
	services::response::ServiceError,
};

use super::Repository;

impl Repository<Comment> {
	pub fn embeds() -> Vec<Embed> {
		vec![Embed::parent("author", Table::Profiles, "author_id")]
	}

	pub async fn insert(
		&self,
		post_id: &str,
		author_id: &str,
		content: &str,
	) -> Result<Comment, ServiceError> {
		let record = json!({
			"content": content,
			"post_id": post_id,
			"author_id": author_id,
		});
		Self::decode(self.backend.insert(Table::Comments, record, &Self::embeds()).await?)
	}
}
