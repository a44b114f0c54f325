use crate::{
	adapters::backend::{Embed, Filter, Order, Select, Table},
	domain::post::{commands::NewPost, Comment, Post, SearchCriteria, UpdatePost},
	services::response::ServiceError,
};

use super::Repository;

impl Repository<Post> {
	/// `author`, `category` and `comments` (each with its `author`).
	pub fn embeds() -> Vec<Embed> {
		let mut comments = Embed::children("comments", Table::Comments, "post_id");
		comments.nested = Repository::<Comment>::embeds();
		vec![
			Embed::parent("author", Table::Profiles, "author_id"),
			Embed::parent("category", Table::Categories, "category_id"),
			comments,
		]
	}

	pub fn listing(criteria: &SearchCriteria) -> Select {
		let mut query = Select::on(Table::Posts).order(Order::desc("created_at"));
		query.embeds = Self::embeds();
		if !criteria.selected_category.is_empty() {
			query = query.filter(Filter::eq("category_id", criteria.selected_category.clone()));
		}
		if !criteria.search_query.is_empty() {
			query = query.filter(Filter::ILikeAny {
				columns: vec!["title", "content"],
				needle: criteria.search_query.clone(),
			});
		}
		query
	}

	/// Posts matching `criteria`, newest first.
	pub async fn list(
		&self,
		criteria: &SearchCriteria,
	) -> Result<Vec<Post>, ServiceError> {
		Self::decode_all(self.backend.select(&Self::listing(criteria)).await?)
	}

	pub(crate) async fn insert(
		&self,
		record: &NewPost,
	) -> Result<Post, ServiceError> {
		let record = serde_json::to_value(record)?;
		Self::decode(self.backend.insert(Table::Posts, record, &Self::embeds()).await?)
	}

	pub async fn update(
		&self,
		id: &str,
		patch: &UpdatePost,
	) -> Result<Post, ServiceError> {
		let patch = serde_json::to_value(patch)?;
		Self::decode(self.backend.update(Table::Posts, patch, &Filter::id(id), &Self::embeds()).await?)
	}

	pub async fn delete(
		&self,
		id: &str,
	) -> Result<(), ServiceError> {
		Ok(self.backend.delete(Table::Posts, &Filter::id(id)).await?)
	}
}

#[cfg(test)]
mod test {
	use super::Repository;
	use crate::{
		adapters::backend::{rest::render_query, Filter},
		domain::post::{Post, SearchCriteria},
	};

	#[test]
	fn test_listing_without_criteria_has_no_filters() {
		let query = Repository::<Post>::listing(&SearchCriteria::default());

		assert!(query.filters.is_empty());
		assert_eq!(
			render_query(&query)[0].1,
			"*,author:profiles(*),category:categories(*),comments(*,author:profiles(*))"
		);
	}

	#[test]
	fn test_listing_applies_both_filter_axes() {
		let query = Repository::<Post>::listing(&SearchCriteria {
			search_query: "rust".to_string(),
			selected_category: "tech".to_string(),
		});

		assert_eq!(query.filters[0], Filter::eq("category_id", "tech"));
		assert!(matches!(&query.filters[1], Filter::ILikeAny { columns, needle } if columns == &vec!["title", "content"] && needle == "rust"));
	}
}
