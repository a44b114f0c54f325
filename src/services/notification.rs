use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NotificationLevel {
	Success,
	Error,
}

/// One transient, user-visible message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
	pub level: NotificationLevel,
	pub message: String,
}

/// Fan-out of notifications to whatever front end is listening.
#[derive(Clone)]
pub struct Notifier(broadcast::Sender<Notification>);

impl Default for Notifier {
	fn default() -> Self {
		Self::new(64)
	}
}

impl Notifier {
	pub fn new(capacity: usize) -> Self {
		let (tx, _rx) = broadcast::channel(capacity.max(1));
		Self(tx)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
		self.0.subscribe()
	}

	pub fn success(
		&self,
		message: impl Into<String>,
	) {
		self.publish(NotificationLevel::Success, message.into());
	}

	pub fn error(
		&self,
		message: impl Into<String>,
	) {
		self.publish(NotificationLevel::Error, message.into());
	}

	fn publish(
		&self,
		level: NotificationLevel,
		message: String,
	) {
		tracing::debug!(?level, %message, "notification");
		// nobody listening is fine
		let _ = self.0.send(Notification { level, message });
	}
}
