//! Capability interface of the hosted backend.
//!
//! The stores never talk HTTP or SQL themselves. They describe what they want
//! as a [`Select`] (table, filters, ordering, relational embeds) or as a single
//! mutation, and a [`Backend`] implementation executes it. Records travel as
//! plain JSON objects; typed decoding happens in the repositories.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use memory::MemoryBackend;
pub use rest::RestBackend;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
	Profiles,
	Categories,
	Posts,
	Comments,
}

impl Table {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Profiles => "profiles",
			Self::Categories => "categories",
			Self::Posts => "posts",
			Self::Comments => "comments",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
	/// `column = value`
	Eq { column: &'static str, value: String },
	/// Case-insensitive substring match on any of `columns`.
	ILikeAny { columns: Vec<&'static str>, needle: String },
}

impl Filter {
	pub fn eq(
		column: &'static str,
		value: impl Into<String>,
	) -> Self {
		Self::Eq { column, value: value.into() }
	}

	pub fn id(value: impl Into<String>) -> Self {
		Self::eq("id", value)
	}

	/// Evaluates the filter against a record the way the hosted service does.
	pub fn matches(
		&self,
		record: &Value,
	) -> bool {
		match self {
			Self::Eq { column, value } => match record.get(*column) {
				Some(Value::String(s)) => s == value,
				Some(Value::Null) | None => false,
				Some(other) => other.to_string() == *value,
			},
			Self::ILikeAny { columns, needle } => {
				let needle = needle.to_lowercase();
				columns
					.iter()
					.filter_map(|column| record.get(*column).and_then(Value::as_str))
					.any(|haystack| haystack.to_lowercase().contains(&needle))
			}
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
	pub column: &'static str,
	pub ascending: bool,
}

impl Order {
	pub fn asc(column: &'static str) -> Self {
		Self { column, ascending: true }
	}
	pub fn desc(column: &'static str) -> Self {
		Self { column, ascending: false }
	}
}

/// How an embedded table relates to the row it is embedded into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Link {
	/// The parent row holds `foreign_key` pointing at the embedded row's id.
	Parent { foreign_key: &'static str },
	/// Embedded rows hold `foreign_key` pointing back at the parent's id.
	Children { foreign_key: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Embed {
	pub alias: &'static str,
	pub table: Table,
	pub link: Link,
	pub nested: Vec<Embed>,
}

impl Embed {
	pub fn parent(
		alias: &'static str,
		table: Table,
		foreign_key: &'static str,
	) -> Self {
		Self {
			alias,
			table,
			link: Link::Parent { foreign_key },
			nested: vec![],
		}
	}

	pub fn children(
		alias: &'static str,
		table: Table,
		foreign_key: &'static str,
	) -> Self {
		Self {
			alias,
			table,
			link: Link::Children { foreign_key },
			nested: vec![],
		}
	}

	pub fn with(
		mut self,
		nested: Embed,
	) -> Self {
		self.nested.push(nested);
		self
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Select {
	pub table: Table,
	pub embeds: Vec<Embed>,
	pub filters: Vec<Filter>,
	pub order: Option<Order>,
}

impl Select {
	pub fn on(table: Table) -> Self {
		Self {
			table,
			embeds: vec![],
			filters: vec![],
			order: None,
		}
	}
	pub fn embed(
		mut self,
		embed: Embed,
	) -> Self {
		self.embeds.push(embed);
		self
	}
	pub fn filter(
		mut self,
		filter: Filter,
	) -> Self {
		self.filters.push(filter);
		self
	}
	pub fn order(
		mut self,
		order: Order,
	) -> Self {
		self.order = Some(order);
		self
	}
}

/// Session handed out by the identity capability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
	pub access_token: String,
	pub user_id: String,
	pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
	#[error("request failed: {0}")]
	Transport(String),

	#[error("service unavailable")]
	Unavailable,

	#[error("invalid login credentials")]
	InvalidCredentials,

	#[error("not authorized: {0}")]
	Unauthorized(String),

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("no matching row")]
	NotFound,

	#[error("rejected by service: {0}")]
	Rejected(String),

	#[error("malformed response: {0}")]
	Decode(String),
}

impl From<reqwest::Error> for BackendError {
	fn from(value: reqwest::Error) -> Self {
		if value.is_decode() {
			BackendError::Decode(value.to_string())
		} else {
			BackendError::Transport(value.to_string())
		}
	}
}

#[async_trait]
pub trait Backend: Send + Sync {
	async fn select(
		&self,
		query: &Select,
	) -> Result<Vec<Value>, BackendError>;

	async fn insert(
		&self,
		table: Table,
		record: Value,
		embeds: &[Embed],
	) -> Result<Value, BackendError>;

	async fn update(
		&self,
		table: Table,
		patch: Value,
		matching: &Filter,
		embeds: &[Embed],
	) -> Result<Value, BackendError>;

	async fn delete(
		&self,
		table: Table,
		matching: &Filter,
	) -> Result<(), BackendError>;

	async fn sign_in(
		&self,
		email: &str,
		password: &str,
	) -> Result<AuthSession, BackendError>;

	async fn sign_up(
		&self,
		username: &str,
		email: &str,
		password: &str,
	) -> Result<AuthSession, BackendError>;

	async fn sign_out(&self) -> Result<(), BackendError>;

	async fn current_session(&self) -> Option<AuthSession>;
}

#[cfg(test)]
mod test {
	use serde_json::json;

	use super::Filter;

	#[test]
	fn test_ilike_any_matches_either_column_case_insensitively() {
		let filter = Filter::ILikeAny {
			columns: vec!["title", "content"],
			needle: "RuSt".to_string(),
		};

		assert!(filter.matches(&json!({"title": "Learning Rust", "content": ""})));
		assert!(filter.matches(&json!({"title": "Intro", "content": "why rustaceans"})));
		assert!(!filter.matches(&json!({"title": "Go", "content": "gophers", "excerpt": "rust"})));
	}

	#[test]
	fn test_eq_never_matches_missing_or_null_column() {
		let filter = Filter::eq("category_id", "tech");

		assert!(filter.matches(&json!({"category_id": "tech"})));
		assert!(!filter.matches(&json!({"category_id": null})));
		assert!(!filter.matches(&json!({"title": "tech"})));
	}
}
