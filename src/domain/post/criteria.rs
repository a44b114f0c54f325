use super::entity::Post;

/// Active search and category filter of the post listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchCriteria {
	pub search_query: String,
	/// Category id; empty means every category.
	pub selected_category: String,
}

impl SearchCriteria {
	pub fn is_empty(&self) -> bool {
		self.search_query.is_empty() && self.selected_category.is_empty()
	}

	/// Local re-check of a loaded post against the criteria. Looks at the
	/// excerpt as well, which the service-side search does not.
	pub fn matches(
		&self,
		post: &Post,
	) -> bool {
		if !self.selected_category.is_empty() && post.category_id != self.selected_category {
			return false;
		}
		if self.search_query.is_empty() {
			return true;
		}
		let query = self.search_query.to_lowercase();
		[&post.title, &post.excerpt, &post.content].iter().any(|field| field.to_lowercase().contains(&query))
	}
}

#[cfg(test)]
mod test {
	use chrono::Utc;

	use super::SearchCriteria;
	use crate::domain::post::Post;

	fn post(
		category_id: &str,
		title: &str,
		excerpt: &str,
	) -> Post {
		Post {
			id: "p".to_string(),
			title: title.to_string(),
			content: String::new(),
			excerpt: excerpt.to_string(),
			featured_image: None,
			author_id: "u1".to_string(),
			author: None,
			category_id: category_id.to_string(),
			category: None,
			comments: vec![],
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn test_filter_axes_are_combined() {
		let criteria = SearchCriteria {
			search_query: "Rust".to_string(),
			selected_category: "tech".to_string(),
		};

		assert!(criteria.matches(&post("tech", "Why rust", "")));
		assert!(criteria.matches(&post("tech", "Intro", "all about RUST")));
		assert!(!criteria.matches(&post("design", "Why rust", "")));
		assert!(!criteria.matches(&post("tech", "Go", "gophers")));
	}

	#[test]
	fn test_empty_criteria_match_everything() {
		assert!(SearchCriteria::default().is_empty());
		assert!(SearchCriteria::default().matches(&post("any", "", "")));
	}
}
