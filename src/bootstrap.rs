use std::sync::Arc;

use crate::{
	adapters::backend::Backend,
	services::{content::ContentStore, notification::Notifier, session::SessionStore},
};

/// The stores of one running client, built once and handed to every consumer.
#[derive(Clone)]
pub struct App {
	pub session: SessionStore,
	pub content: ContentStore,
	pub notifier: Notifier,
}

pub struct Bootstrap;
impl Bootstrap {
	pub fn app(
		backend: Arc<dyn Backend>,
		page_size: usize,
	) -> App {
		let notifier = Notifier::default();
		let session = SessionStore::new(backend.clone(), notifier.clone());
		let content = ContentStore::new(backend, session.clone(), notifier.clone(), page_size);
		App { session, content, notifier }
	}

	/// Adopts any existing session and performs the initial load. Failures have
	/// already been notified and do not prevent startup.
	pub async fn load(app: &App) {
		let _ = app.session.restore().await;
		let _ = app.content.init().await;
	}

	pub async fn start(
		backend: Arc<dyn Backend>,
		page_size: usize,
	) -> App {
		let app = Self::app(backend, page_size);
		Self::load(&app).await;
		app
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use serde_json::json;

	use super::Bootstrap;
	use crate::adapters::backend::{MemoryBackend, Table};

	#[tokio::test]
	async fn test_start_loads_content_and_shares_session() {
		'_given: {
			let backend = Arc::new(MemoryBackend::new());
			backend
				.seed(
					Table::Profiles,
					[json!({"id": "u1", "username": "ferris", "avatar_url": null, "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"})],
				)
				.await;
			backend.seed_account("u1", "ferris@example.com", "crab-rave").await;
			backend
				.seed(Table::Categories, [json!({"id": "tech", "name": "Technology", "slug": "technology", "created_at": "2024-01-01T00:00:00Z"})])
				.await;

			'_when: {
				let app = Bootstrap::start(backend, 6).await;
				assert_eq!(app.content.categories().await.len(), 1);

				app.session.login("ferris@example.com", "crab-rave").await.unwrap();
				let comment = app.content.add_comment("missing", "hello").await;

				// the content store sees the login; the backend rejects the unknown post
				assert!(comment.is_err());
				assert!(app.session.is_authenticated().await);
			}
		}
	}

	#[tokio::test]
	async fn test_start_survives_unreachable_backend() {
		let backend = Arc::new(MemoryBackend::new());
		backend.set_offline(true).await;

		let app = Bootstrap::start(backend, 6).await;

		assert!(app.content.posts().await.is_empty());
		assert!(app.content.categories().await.is_empty());
		assert!(!app.content.is_loading().await);
		assert!(!app.session.is_authenticated().await);
	}
}
