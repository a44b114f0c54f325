//! In-process backend with the observable contract of the hosted service.
//!
//! Rows live in per-table vectors in insertion order. The backend mirrors the
//! service-side rules the client relies on: generated ids and timestamps,
//! unique usernames and slugs, foreign keys, row ownership for posts and
//! comments, cascading comment removal and relational embeds.

use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use super::{AuthSession, Backend, BackendError, Embed, Filter, Link, Order, Select, Table};

struct Account {
	user_id: String,
	email: String,
	password: String,
}

#[derive(Default)]
struct MemoryState {
	tables: HashMap<Table, Vec<Value>>,
	accounts: Vec<Account>,
	session: Option<AuthSession>,
	offline: bool,
}

#[derive(Default)]
pub struct MemoryBackend {
	state: Mutex<MemoryState>,
	held_select: Mutex<Option<oneshot::Receiver<()>>>,
}

pub fn timestamp() -> String {
	Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts rows verbatim, bypassing every service rule.
	pub async fn seed(
		&self,
		table: Table,
		rows: impl IntoIterator<Item = Value>,
	) {
		self.state.lock().await.tables.entry(table).or_default().extend(rows);
	}

	/// Registers an account for an already seeded profile.
	pub async fn seed_account(
		&self,
		user_id: &str,
		email: &str,
		password: &str,
	) {
		self.state.lock().await.accounts.push(Account {
			user_id: user_id.to_string(),
			email: email.to_string(),
			password: password.to_string(),
		});
	}

	/// While offline every capability fails with [`BackendError::Unavailable`].
	pub async fn set_offline(
		&self,
		offline: bool,
	) {
		self.state.lock().await.offline = offline;
	}

	/// Makes the next `select` wait until the returned sender fires or is dropped.
	pub async fn hold_next_select(&self) -> oneshot::Sender<()> {
		let (tx, rx) = oneshot::channel();
		*self.held_select.lock().await = Some(rx);
		tx
	}

	pub async fn rows(
		&self,
		table: Table,
	) -> Vec<Value> {
		self.state.lock().await.rows(table).to_vec()
	}
}

impl MemoryState {
	fn ensure_online(&self) -> Result<(), BackendError> {
		if self.offline {
			return Err(BackendError::Unavailable);
		}
		Ok(())
	}

	fn rows(
		&self,
		table: Table,
	) -> &[Value] {
		self.tables.get(&table).map(Vec::as_slice).unwrap_or_default()
	}

	fn find(
		&self,
		table: Table,
		id: &str,
	) -> Option<&Value> {
		self.rows(table).iter().find(|row| row.get("id").and_then(Value::as_str) == Some(id))
	}

	fn expand(
		&self,
		mut record: Value,
		embeds: &[Embed],
	) -> Value {
		for embed in embeds {
			let expanded = match &embed.link {
				Link::Parent { foreign_key } => record
					.get(*foreign_key)
					.and_then(Value::as_str)
					.and_then(|id| self.find(embed.table, id))
					.map(|row| self.expand(row.clone(), &embed.nested))
					.unwrap_or(Value::Null),
				Link::Children { foreign_key } => {
					let parent_id = record.get("id").cloned().unwrap_or(Value::Null);
					let mut children: Vec<Value> = self
						.rows(embed.table)
						.iter()
						.filter(|row| row.get(*foreign_key) == Some(&parent_id))
						.cloned()
						.collect();
					sort_rows(&mut children, &Order::asc("created_at"));
					Value::Array(children.into_iter().map(|row| self.expand(row, &embed.nested)).collect())
				}
			};
			if let Value::Object(fields) = &mut record {
				fields.insert(embed.alias.to_string(), expanded);
			}
		}
		record
	}

	fn session_user(
		&self,
		action: &str,
	) -> Result<String, BackendError> {
		self.session
			.as_ref()
			.map(|session| session.user_id.clone())
			.ok_or_else(|| BackendError::Unauthorized(format!("{action} requires a signed-in user")))
	}

	/// Row level rules: posts and comments may only be written by their author.
	fn check_ownership(
		&self,
		table: Table,
		row: &Value,
	) -> Result<(), BackendError> {
		if !matches!(table, Table::Posts | Table::Comments) {
			return Ok(());
		}
		let user_id = self.session_user(table.as_str())?;
		if row.get("author_id").and_then(Value::as_str) != Some(user_id.as_str()) {
			return Err(BackendError::Unauthorized(format!("row in {} is owned by another user", table.as_str())));
		}
		Ok(())
	}

	fn check_foreign_keys(
		&self,
		table: Table,
		row: &Value,
	) -> Result<(), BackendError> {
		let keys: &[(&str, Table)] = match table {
			Table::Posts => &[("author_id", Table::Profiles), ("category_id", Table::Categories)],
			Table::Comments => &[("author_id", Table::Profiles), ("post_id", Table::Posts)],
			_ => &[],
		};
		for (column, target) in keys {
			let exists = row.get(*column).and_then(Value::as_str).is_some_and(|id| self.find(*target, id).is_some());
			if !exists {
				return Err(BackendError::Rejected(format!(
					"insert or update on table \"{}\" violates foreign key constraint on \"{column}\"",
					table.as_str()
				)));
			}
		}
		Ok(())
	}

	fn check_unique(
		&self,
		table: Table,
		row: &Value,
	) -> Result<(), BackendError> {
		let column = match table {
			Table::Profiles => "username",
			Table::Categories => "slug",
			_ => return Ok(()),
		};
		let value = row.get(column);
		let id = row.get("id");
		let taken = self.rows(table).iter().any(|other| other.get("id") != id && other.get(column) == value);
		if taken {
			return Err(BackendError::Conflict(format!(
				"duplicate key value violates unique constraint \"{}_{column}_key\"",
				table.as_str()
			)));
		}
		Ok(())
	}
}

fn required_columns(table: Table) -> &'static [&'static str] {
	match table {
		Table::Profiles => &["username"],
		Table::Categories => &["name", "slug"],
		Table::Posts => &["title", "content", "excerpt", "author_id", "category_id"],
		Table::Comments => &["content", "author_id", "post_id"],
	}
}

fn has_updated_at(table: Table) -> bool {
	matches!(table, Table::Profiles | Table::Posts)
}

fn compare_values(
	a: Option<&Value>,
	b: Option<&Value>,
) -> Ordering {
	match (a, b) {
		(Some(Value::String(a)), Some(Value::String(b))) => {
			// timestamps of differing precision do not order lexically
			match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
				(Ok(a), Ok(b)) => a.cmp(&b),
				_ => a.cmp(b),
			}
		}
		(Some(Value::Number(a)), Some(Value::Number(b))) => {
			a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal)
		}
		// nulls sort last
		(None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
		(None | Some(Value::Null), _) => Ordering::Greater,
		(_, None | Some(Value::Null)) => Ordering::Less,
		(Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
	}
}

fn sort_rows(
	rows: &mut [Value],
	order: &Order,
) {
	rows.sort_by(|a, b| {
		let ordering = compare_values(a.get(order.column), b.get(order.column));
		if order.ascending {
			ordering
		} else {
			ordering.reverse()
		}
	});
}

fn into_object(
	table: Table,
	record: Value,
) -> Result<Map<String, Value>, BackendError> {
	match record {
		Value::Object(fields) => Ok(fields),
		_ => Err(BackendError::Rejected(format!("record for {} must be a JSON object", table.as_str()))),
	}
}

#[async_trait]
impl Backend for MemoryBackend {
	async fn select(
		&self,
		query: &Select,
	) -> Result<Vec<Value>, BackendError> {
		let held = self.held_select.lock().await.take();
		if let Some(release) = held {
			let _ = release.await;
		}

		let state = self.state.lock().await;
		state.ensure_online()?;

		let mut rows: Vec<Value> = state
			.rows(query.table)
			.iter()
			.filter(|row| query.filters.iter().all(|filter| filter.matches(row)))
			.cloned()
			.collect();
		if let Some(order) = &query.order {
			sort_rows(&mut rows, order);
		}
		Ok(rows.into_iter().map(|row| state.expand(row, &query.embeds)).collect())
	}

	async fn insert(
		&self,
		table: Table,
		record: Value,
		embeds: &[Embed],
	) -> Result<Value, BackendError> {
		let mut state = self.state.lock().await;
		state.ensure_online()?;

		let mut fields = into_object(table, record)?;
		for column in required_columns(table) {
			if fields.get(*column).map_or(true, Value::is_null) {
				return Err(BackendError::Rejected(format!(
					"null value in column \"{column}\" of relation \"{}\" violates not-null constraint",
					table.as_str()
				)));
			}
		}
		let now = timestamp();
		fields.entry("id").or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
		fields.entry("created_at").or_insert_with(|| Value::String(now.clone()));
		if has_updated_at(table) {
			fields.entry("updated_at").or_insert_with(|| Value::String(now));
		}
		if table == Table::Posts {
			fields.entry("featured_image").or_insert(Value::Null);
		}
		let row = Value::Object(fields);

		state.check_ownership(table, &row)?;
		state.check_foreign_keys(table, &row)?;
		state.check_unique(table, &row)?;

		state.tables.entry(table).or_default().push(row.clone());
		Ok(state.expand(row, embeds))
	}

	async fn update(
		&self,
		table: Table,
		patch: Value,
		matching: &Filter,
		embeds: &[Embed],
	) -> Result<Value, BackendError> {
		let mut state = self.state.lock().await;
		state.ensure_online()?;

		let patch = into_object(table, patch)?;
		let position = state
			.rows(table)
			.iter()
			.position(|row| matching.matches(row))
			.ok_or(BackendError::NotFound)?;

		let current = state.rows(table)[position].clone();
		state.check_ownership(table, &current)?;

		let mut updated = current;
		if let Value::Object(fields) = &mut updated {
			for (column, value) in patch {
				if column != "id" {
					fields.insert(column, value);
				}
			}
			if has_updated_at(table) {
				fields.insert("updated_at".to_string(), Value::String(timestamp()));
			}
		}
		state.check_foreign_keys(table, &updated)?;
		state.check_unique(table, &updated)?;

		if let Some(rows) = state.tables.get_mut(&table) {
			rows[position] = updated.clone();
		}
		Ok(state.expand(updated, embeds))
	}

	async fn delete(
		&self,
		table: Table,
		matching: &Filter,
	) -> Result<(), BackendError> {
		let mut state = self.state.lock().await;
		state.ensure_online()?;

		let doomed: Vec<Value> = state.rows(table).iter().filter(|row| matching.matches(row)).cloned().collect();
		if doomed.is_empty() {
			return Err(BackendError::NotFound);
		}
		for row in &doomed {
			state.check_ownership(table, row)?;
		}

		if let Some(rows) = state.tables.get_mut(&table) {
			rows.retain(|row| !matching.matches(row));
		}
		// comments.post_id references posts(id) on delete cascade
		if table == Table::Posts {
			let removed: Vec<&Value> = doomed.iter().filter_map(|row| row.get("id")).collect();
			if let Some(comments) = state.tables.get_mut(&Table::Comments) {
				comments.retain(|comment| !comment.get("post_id").is_some_and(|post_id| removed.contains(&post_id)));
			}
		}
		Ok(())
	}

	async fn sign_in(
		&self,
		email: &str,
		password: &str,
	) -> Result<AuthSession, BackendError> {
		let mut state = self.state.lock().await;
		state.ensure_online()?;

		let account = state
			.accounts
			.iter()
			.find(|account| account.email.eq_ignore_ascii_case(email) && account.password == password)
			.ok_or(BackendError::InvalidCredentials)?;
		let session = AuthSession {
			access_token: Uuid::new_v4().to_string(),
			user_id: account.user_id.clone(),
			email: account.email.clone(),
		};
		state.session = Some(session.clone());
		Ok(session)
	}

	async fn sign_up(
		&self,
		username: &str,
		email: &str,
		password: &str,
	) -> Result<AuthSession, BackendError> {
		let mut state = self.state.lock().await;
		state.ensure_online()?;

		if state.accounts.iter().any(|account| account.email.eq_ignore_ascii_case(email)) {
			return Err(BackendError::Conflict("User already registered".to_string()));
		}

		// the service creates the profile row alongside the account
		let user_id = Uuid::new_v4().to_string();
		let now = timestamp();
		let profile = serde_json::json!({
			"id": user_id,
			"username": username,
			"avatar_url": null,
			"created_at": now,
			"updated_at": now,
		});
		state.check_unique(Table::Profiles, &profile)?;
		state.tables.entry(Table::Profiles).or_default().push(profile);
		state.accounts.push(Account {
			user_id: user_id.clone(),
			email: email.to_string(),
			password: password.to_string(),
		});

		let session = AuthSession {
			access_token: Uuid::new_v4().to_string(),
			user_id,
			email: email.to_string(),
		};
		state.session = Some(session.clone());
		Ok(session)
	}

	async fn sign_out(&self) -> Result<(), BackendError> {
		let mut state = self.state.lock().await;
		state.ensure_online()?;
		state.session = None;
		Ok(())
	}

	async fn current_session(&self) -> Option<AuthSession> {
		self.state.lock().await.session.clone()
	}
}
