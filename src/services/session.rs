use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
	adapters::{
		backend::{AuthSession, Backend, BackendError},
		repositories::Repository,
	},
	domain::profile::Profile,
};

use super::{notification::Notifier, response::ServiceError};

#[derive(Default)]
pub struct SessionState {
	pub profile: Option<Profile>,
	pub session: Option<AuthSession>,
	pub is_loading: bool,
}

#[derive(Clone, Default)]
pub struct SessionStateWrapper(pub Arc<RwLock<SessionState>>);
impl SessionStateWrapper {
	pub(crate) async fn read(&self) -> RwLockReadGuard<'_, SessionState> {
		self.0.read().await
	}
	pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
		self.0.write().await
	}
}

/// Holds at most one signed-in profile.
#[derive(Clone)]
pub struct SessionStore {
	state: SessionStateWrapper,
	backend: Arc<dyn Backend>,
	profiles: Repository<Profile>,
	notifier: Notifier,
}

fn validate_credentials(
	email: &str,
	password: &str,
) -> Result<(), ServiceError> {
	if email.trim().is_empty() || password.is_empty() {
		return Err(ServiceError::ValidationError("Email and password are required".to_string()));
	}
	Ok(())
}

fn validate_registration(
	username: &str,
	email: &str,
	password: &str,
) -> Result<(), ServiceError> {
	let username_ok = (3..=32).contains(&username.chars().count())
		&& username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-');
	if !username_ok {
		return Err(ServiceError::ValidationError(
			"Username must be 3 to 32 letters, digits, '_' or '-'".to_string(),
		));
	}
	let email_ok = email
		.split_once('@')
		.is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'));
	if !email_ok {
		return Err(ServiceError::ValidationError(format!("'{email}' is not a valid email address")));
	}
	if password.chars().count() < 6 {
		return Err(ServiceError::ValidationError("Password must be at least 6 characters".to_string()));
	}
	Ok(())
}

impl SessionStore {
	pub fn new(
		backend: Arc<dyn Backend>,
		notifier: Notifier,
	) -> Self {
		Self {
			state: Default::default(),
			profiles: Repository::new(backend.clone()),
			backend,
			notifier,
		}
	}

	pub async fn current_user(&self) -> Option<Profile> {
		self.state.read().await.profile.clone()
	}

	pub async fn is_authenticated(&self) -> bool {
		self.state.read().await.profile.is_some()
	}

	pub async fn is_loading(&self) -> bool {
		self.state.read().await.is_loading
	}

	pub async fn access_token(&self) -> Option<String> {
		self.state.read().await.session.as_ref().map(|session| session.access_token.clone())
	}

	pub async fn login(
		&self,
		email: &str,
		password: &str,
	) -> Result<Profile, ServiceError> {
		if let Err(err) = validate_credentials(email, password) {
			return Err(self.report("logging in", err));
		}
		self.state.write().await.is_loading = true;
		let result = match self.backend.sign_in(email, password).await {
			Ok(session) => self.adopt(session).await,
			Err(err) => Err(err.into()),
		};
		self.finish("Welcome back", "logging in", result).await
	}

	pub async fn register(
		&self,
		username: &str,
		email: &str,
		password: &str,
	) -> Result<Profile, ServiceError> {
		let username = username.trim();
		if let Err(err) = validate_registration(username, email, password) {
			return Err(self.report("registering", err));
		}
		self.state.write().await.is_loading = true;
		let result = match self.backend.sign_up(username, email, password).await {
			Ok(session) => self.adopt(session).await,
			Err(BackendError::Conflict(message)) if !message.contains("already registered") => {
				Err(ServiceError::DuplicateUsername(username.to_string()))
			}
			Err(err) => Err(err.into()),
		};
		self.finish("Welcome", "registering", result).await
	}

	/// Clears the session. Calling it while signed out does nothing.
	pub async fn logout(&self) -> Result<(), ServiceError> {
		if self.state.read().await.session.is_none() {
			return Ok(());
		}
		let result = self.backend.sign_out().await;
		{
			let mut state = self.state.write().await;
			state.profile = None;
			state.session = None;
		}
		match result {
			Ok(()) => {
				tracing::info!("signed out");
				self.notifier.success("Logged out");
				Ok(())
			}
			Err(err) => Err(self.report("logging out", err.into())),
		}
	}

	/// Adopts a session the backend already holds, if any.
	pub async fn restore(&self) -> Result<Option<Profile>, ServiceError> {
		let Some(session) = self.backend.current_session().await else {
			return Ok(None);
		};
		match self.resolve_profile(session).await {
			Ok(profile) => {
				tracing::info!(username = %profile.username, "session restored");
				Ok(Some(profile))
			}
			Err(err) => Err(self.report("restoring session", err)),
		}
	}

	/// Resolves the profile of a freshly opened session. When that fails the
	/// backend session is closed again so no stray token outlives the failure.
	async fn adopt(
		&self,
		session: AuthSession,
	) -> Result<Profile, ServiceError> {
		let result = self.resolve_profile(session).await;
		if result.is_err() {
			if let Err(err) = self.backend.sign_out().await {
				tracing::warn!(error = %err, "could not close session without profile");
			}
		}
		result
	}

	async fn resolve_profile(
		&self,
		session: AuthSession,
	) -> Result<Profile, ServiceError> {
		let profile = self.profiles.find(&session.user_id).await?.ok_or(ServiceError::EntityNotFound)?;
		let mut state = self.state.write().await;
		state.profile = Some(profile.clone());
		state.session = Some(session);
		Ok(profile)
	}

	async fn finish(
		&self,
		greeting: &str,
		action: &str,
		result: Result<Profile, ServiceError>,
	) -> Result<Profile, ServiceError> {
		self.state.write().await.is_loading = false;
		match result {
			Ok(profile) => {
				tracing::info!(username = %profile.username, "signed in");
				self.notifier.success(format!("{greeting}, {}!", profile.username));
				Ok(profile)
			}
			Err(err) => Err(self.report(action, err)),
		}
	}

	fn report(
		&self,
		action: &str,
		err: ServiceError,
	) -> ServiceError {
		tracing::error!(error = %err, "Error {}", action);
		self.notifier.error(err.to_string());
		err
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use serde_json::json;

	use super::SessionStore;
	use crate::{
		adapters::backend::{Backend, MemoryBackend, Table},
		services::{
			notification::{NotificationLevel, Notifier},
			response::ServiceError,
		},
	};

	async fn set_up() -> (Arc<MemoryBackend>, SessionStore, Notifier) {
		let backend = Arc::new(MemoryBackend::new());
		backend
			.seed(
				Table::Profiles,
				[json!({"id": "u1", "username": "ferris", "avatar_url": null, "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"})],
			)
			.await;
		backend.seed_account("u1", "ferris@example.com", "crab-rave").await;
		let notifier = Notifier::default();
		let store = SessionStore::new(backend.clone(), notifier.clone());
		(backend, store, notifier)
	}

	#[tokio::test]
	async fn test_login_sets_profile() {
		'_given: {
			let (_backend, store, notifier) = set_up().await;
			let mut notifications = notifier.subscribe();

			'_when: {
				let profile = store.login("ferris@example.com", "crab-rave").await.unwrap();

				assert_eq!(profile.username, "ferris");
				assert_eq!(store.current_user().await, Some(profile));
				assert!(store.access_token().await.is_some());
				assert!(!store.is_loading().await);
				assert_eq!(notifications.try_recv().unwrap().level, NotificationLevel::Success);
			}
		}
	}

	#[tokio::test]
	async fn test_failed_login_leaves_session_unchanged() {
		'_given: {
			let (_backend, store, notifier) = set_up().await;
			let mut notifications = notifier.subscribe();

			'_when: {
				let result = store.login("ferris@example.com", "wrong").await;

				assert!(matches!(result, Err(ServiceError::InvalidCredentials)));
				assert!(!store.is_authenticated().await);
				assert!(!store.is_loading().await);
				let notification = notifications.try_recv().unwrap();
				assert_eq!(notification.level, NotificationLevel::Error);
				assert!(notifications.try_recv().is_err());
			}
		}
	}

	#[tokio::test]
	async fn test_login_without_profile_closes_backend_session() {
		'_given: {
			let (backend, store, notifier) = set_up().await;
			backend.seed_account("ghost", "ghost@example.com", "secret-1").await;
			let mut notifications = notifier.subscribe();

			'_when: {
				let result = store.login("ghost@example.com", "secret-1").await;

				assert!(matches!(result, Err(ServiceError::EntityNotFound)));
				assert!(!store.is_authenticated().await);
				assert!(store.access_token().await.is_none());
				assert!(backend.current_session().await.is_none());
				assert_eq!(notifications.try_recv().unwrap().level, NotificationLevel::Error);
				assert!(store.restore().await.unwrap().is_none());
			}
		}
	}

	#[tokio::test]
	async fn test_register_creates_profile() {
		let (_backend, store, _notifier) = set_up().await;

		let profile = store.register("  crab_2 ", "crab@example.com", "secret-1").await.unwrap();

		assert_eq!(profile.username, "crab_2");
		assert!(store.is_authenticated().await);
	}

	#[tokio::test]
	async fn test_register_with_taken_username() {
		let (_backend, store, _notifier) = set_up().await;

		let result = store.register("ferris", "other@example.com", "secret-1").await;

		assert!(matches!(result, Err(ServiceError::DuplicateUsername(name)) if name == "ferris"));
		assert!(!store.is_authenticated().await);
	}

	#[tokio::test]
	async fn test_register_rejects_malformed_input_before_calling_backend() {
		let (backend, store, _notifier) = set_up().await;
		backend.set_offline(true).await;

		for (username, email, password) in [("ab", "a@b.co", "secret-1"), ("crab", "not-an-email", "secret-1"), ("crab", "a@b.co", "123")] {
			let result = store.register(username, email, password).await;
			assert!(matches!(result, Err(ServiceError::ValidationError(_))));
		}
	}

	#[tokio::test]
	async fn test_logout_is_idempotent() {
		let (backend, store, notifier) = set_up().await;
		store.login("ferris@example.com", "crab-rave").await.unwrap();
		let mut notifications = notifier.subscribe();

		store.logout().await.unwrap();
		store.logout().await.unwrap();

		assert!(store.current_user().await.is_none());
		assert!(backend.current_session().await.is_none());
		assert_eq!(notifications.try_recv().unwrap().message, "Logged out");
		assert!(notifications.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_restore_adopts_backend_session() {
		let (backend, store, _notifier) = set_up().await;
		backend.sign_in("ferris@example.com", "crab-rave").await.unwrap();

		let restored = store.restore().await.unwrap();

		assert_eq!(restored.map(|profile| profile.id), Some("u1".to_string()));
		assert!(store.is_authenticated().await);
	}
}
