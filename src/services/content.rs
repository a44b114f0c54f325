use std::{future::Future, sync::Arc};

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
	adapters::{backend::Backend, repositories::Repository},
	domain::{
		category::Category,
		pagination::{Page, Pagination},
		post::{commands::NewPost, Comment, CreatePost, Post, SearchCriteria, UpdatePost},
	},
};

use super::{notification::Notifier, response::ServiceError, session::SessionStore};

pub struct ContentState {
	pub posts: Vec<Post>,
	pub categories: Vec<Category>,
	pub criteria: SearchCriteria,
	pub pagination: Pagination,
	pub is_loading: bool,
	/// Bumped by every post fetch; only the latest one may apply its result.
	generation: u64,
}

impl ContentState {
	fn new(page_size: usize) -> Self {
		Self {
			posts: vec![],
			categories: vec![],
			criteria: Default::default(),
			pagination: Pagination::new(page_size),
			is_loading: false,
			generation: 0,
		}
	}

	fn visible_posts(&self) -> Vec<Post> {
		self.posts.iter().filter(|post| self.criteria.matches(post)).cloned().collect()
	}
}

#[derive(Clone)]
pub struct ContentStateWrapper(pub Arc<RwLock<ContentState>>);
impl From<ContentState> for ContentStateWrapper {
	fn from(value: ContentState) -> Self {
		Self(Arc::new(RwLock::new(value)))
	}
}
impl ContentStateWrapper {
	pub(crate) async fn read(&self) -> RwLockReadGuard<'_, ContentState> {
		self.0.read().await
	}
	pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, ContentState> {
		self.0.write().await
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
	/// The listing was replaced with this many posts.
	Applied(usize),
	/// A newer fetch was issued while this one was in flight; its result was dropped.
	Superseded,
}

/// In-memory authority for posts and categories of one running client.
#[derive(Clone)]
pub struct ContentStore {
	state: ContentStateWrapper,
	posts: Repository<Post>,
	categories: Repository<Category>,
	comments: Repository<Comment>,
	session: SessionStore,
	notifier: Notifier,
}

impl ContentStore {
	pub fn new(
		backend: Arc<dyn Backend>,
		session: SessionStore,
		notifier: Notifier,
		page_size: usize,
	) -> Self {
		Self {
			state: ContentState::new(page_size).into(),
			posts: Repository::new(backend.clone()),
			categories: Repository::new(backend.clone()),
			comments: Repository::new(backend),
			session,
			notifier,
		}
	}

	/// Initial load of categories and posts.
	pub async fn init(&self) -> Result<(), ServiceError> {
		let (categories, posts) = tokio::join!(self.fetch_categories(), self.fetch_posts());
		categories?;
		posts.map(|_| ())
	}

	pub async fn posts(&self) -> Vec<Post> {
		self.state.read().await.posts.clone()
	}

	pub async fn categories(&self) -> Vec<Category> {
		self.state.read().await.categories.clone()
	}

	pub async fn criteria(&self) -> SearchCriteria {
		self.state.read().await.criteria.clone()
	}

	pub async fn is_loading(&self) -> bool {
		self.state.read().await.is_loading
	}

	/// Looks only at posts already loaded; never reaches the backend.
	pub async fn get_post_by_id(
		&self,
		id: &str,
	) -> Option<Post> {
		self.state.read().await.posts.iter().find(|post| post.id == id).cloned()
	}

	/// Loaded posts that satisfy the active criteria.
	pub async fn visible_posts(&self) -> Vec<Post> {
		self.state.read().await.visible_posts()
	}

	pub async fn current_page(&self) -> Page<Post> {
		let state = self.state.read().await;
		state.pagination.current(&state.visible_posts())
	}

	pub async fn set_page(
		&self,
		page: usize,
	) -> usize {
		let mut state = self.state.write().await;
		let total = state.visible_posts().len();
		state.pagination.go_to(page, total)
	}

	pub async fn next_page(&self) -> usize {
		let current = self.state.read().await.pagination.current_page;
		self.set_page(current + 1).await
	}

	pub async fn previous_page(&self) -> usize {
		let current = self.state.read().await.pagination.current_page;
		self.set_page(current.saturating_sub(1)).await
	}

	pub async fn fetch_categories(&self) -> Result<(), ServiceError> {
		match self.categories.list().await {
			Ok(categories) => {
				self.state.write().await.categories = categories;
				Ok(())
			}
			Err(err) => Err(self.report("fetching categories", "Failed to load categories", err)),
		}
	}

	pub async fn fetch_posts(&self) -> Result<FetchOutcome, ServiceError> {
		let (generation, criteria) = {
			let mut state = self.state.write().await;
			state.generation += 1;
			state.is_loading = true;
			(state.generation, state.criteria.clone())
		};

		let result = self.posts.list(&criteria).await;

		let mut state = self.state.write().await;
		let latest = state.generation == generation;
		if latest {
			state.is_loading = false;
		}
		match result {
			Ok(posts) if latest => {
				let count = posts.len();
				state.posts = posts;
				Ok(FetchOutcome::Applied(count))
			}
			Ok(_) => {
				tracing::debug!(generation, latest = state.generation, "discarding superseded post listing");
				Ok(FetchOutcome::Superseded)
			}
			Err(err) => {
				drop(state);
				Err(self.report("fetching posts", "Failed to load posts", err))
			}
		}
	}

	pub async fn set_search_query(
		&self,
		query: impl Into<String>,
	) -> Result<Option<FetchOutcome>, ServiceError> {
		let query = query.into();
		self.change_criteria(|criteria| criteria.search_query = query).await
	}

	pub async fn set_selected_category(
		&self,
		category_id: impl Into<String>,
	) -> Result<Option<FetchOutcome>, ServiceError> {
		let category_id = category_id.into();
		self.change_criteria(|criteria| criteria.selected_category = category_id).await
	}

	/// Selects `category_id`, or clears the filter when it is already selected.
	pub async fn toggle_category(
		&self,
		category_id: &str,
	) -> Result<Option<FetchOutcome>, ServiceError> {
		let selected = self.state.read().await.criteria.selected_category.clone();
		let next = if selected == category_id { String::new() } else { category_id.to_string() };
		self.set_selected_category(next).await
	}

	/// Resets to page 1 and refetches when the criteria actually changed.
	async fn change_criteria(
		&self,
		change: impl FnOnce(&mut SearchCriteria),
	) -> Result<Option<FetchOutcome>, ServiceError> {
		let changed = {
			let mut state = self.state.write().await;
			state.pagination.reset();
			let before = state.criteria.clone();
			change(&mut state.criteria);
			state.criteria != before
		};
		if !changed {
			return Ok(None);
		}
		self.fetch_posts().await.map(Some)
	}

	pub async fn create_post(
		&self,
		command: CreatePost,
	) -> Result<Post, ServiceError> {
		let Some(author) = self.session.current_user().await else {
			return Err(self.reject(ServiceError::Unauthorized("You must be logged in to create a post".to_string())));
		};
		if let Err(err) = command.validate() {
			return Err(self.reject(err));
		}
		let category_id = match command.category_id.clone().filter(|id| !id.is_empty()) {
			Some(id) => id,
			None => match self.state.read().await.categories.first() {
				Some(category) => category.id.clone(),
				None => {
					return Err(self.reject(ServiceError::ValidationError("A category is required".to_string())));
				}
			},
		};

		let record = NewPost::new(command, author.id, category_id);
		let post = self.mutate("creating post", "Failed to create post", self.posts.insert(&record)).await?;

		self.state.write().await.posts.insert(0, post.clone());
		self.notifier.success("Post created successfully!");
		Ok(post)
	}

	pub async fn update_post(
		&self,
		id: &str,
		patch: UpdatePost,
	) -> Result<Post, ServiceError> {
		if let Err(err) = patch.validate() {
			return Err(self.reject(err));
		}
		let post = self.mutate("updating post", "Failed to update post", self.posts.update(id, &patch)).await?;

		{
			let mut state = self.state.write().await;
			if let Some(slot) = state.posts.iter_mut().find(|existing| existing.id == id) {
				*slot = post.clone();
			}
		}
		self.notifier.success("Post updated successfully!");
		Ok(post)
	}

	pub async fn delete_post(
		&self,
		id: &str,
	) -> Result<(), ServiceError> {
		self.mutate("deleting post", "Failed to delete post", self.posts.delete(id)).await?;

		self.state.write().await.posts.retain(|post| post.id != id);
		self.notifier.success("Post deleted successfully!");
		Ok(())
	}

	pub async fn add_comment(
		&self,
		post_id: &str,
		content: &str,
	) -> Result<Comment, ServiceError> {
		let Some(author) = self.session.current_user().await else {
			return Err(self.reject(ServiceError::Unauthorized("You must be logged in to comment".to_string())));
		};
		if content.trim().is_empty() {
			return Err(self.reject(ServiceError::ValidationError("Comment cannot be empty".to_string())));
		}
		let comment = self
			.mutate("adding comment", "Failed to add comment", self.comments.insert(post_id, &author.id, content))
			.await?;

		{
			let mut state = self.state.write().await;
			if let Some(post) = state.posts.iter_mut().find(|post| post.id == post_id) {
				post.comments.push(comment.clone());
			}
		}
		self.notifier.success("Comment added!");
		Ok(comment)
	}

	/// Runs one backend call with the loading flag raised; failures are
	/// logged and notified once.
	async fn mutate<T>(
		&self,
		action: &str,
		failure: &str,
		call: impl Future<Output = Result<T, ServiceError>>,
	) -> Result<T, ServiceError> {
		self.state.write().await.is_loading = true;
		let result = call.await;
		self.state.write().await.is_loading = false;
		result.map_err(|err| self.report(action, failure, err))
	}

	fn report(
		&self,
		action: &str,
		failure: &str,
		err: ServiceError,
	) -> ServiceError {
		tracing::error!(error = %err, "Error {}", action);
		self.notifier.error(failure);
		err
	}

	fn reject(
		&self,
		err: ServiceError,
	) -> ServiceError {
		tracing::warn!(error = %err, "request rejected before reaching the backend");
		self.notifier.error(err.to_string());
		err
	}
}
