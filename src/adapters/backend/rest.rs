//! HTTP client for a Supabase-compatible service.
//!
//! Tables are served under `/rest/v1` using the PostgREST query grammar and
//! identity under `/auth/v1`. The access token of the signed-in user is kept
//! here so every later request runs with that user's row permissions.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::instrument;

use super::{AuthSession, Backend, BackendError, Embed, Filter, Link, Order, Select, Table};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

pub struct RestBackend {
	client: Client,
	base_url: String,
	anon_key: String,
	session: RwLock<Option<AuthSession>>,
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: Option<String>,
	user: Option<AuthUser>,
}

#[derive(Deserialize)]
struct AuthUser {
	id: String,
	#[serde(default)]
	email: Option<String>,
}

impl RestBackend {
	pub fn new(
		base_url: impl Into<String>,
		anon_key: impl Into<String>,
	) -> Self {
		Self {
			client: Client::new(),
			base_url: base_url.into().trim_end_matches('/').to_string(),
			anon_key: anon_key.into(),
			session: RwLock::new(None),
		}
	}

	fn table_url(
		&self,
		table: Table,
	) -> String {
		format!("{}/rest/v1/{}", self.base_url, table.as_str())
	}

	fn auth_url(
		&self,
		path: &str,
	) -> String {
		format!("{}/auth/v1/{}", self.base_url, path)
	}

	async fn authorized(
		&self,
		request: RequestBuilder,
	) -> RequestBuilder {
		let bearer = match self.session.read().await.as_ref() {
			Some(session) => session.access_token.clone(),
			None => self.anon_key.clone(),
		};
		request.header("apikey", &self.anon_key).bearer_auth(bearer)
	}

	async fn single(
		&self,
		request: RequestBuilder,
	) -> Result<Value, BackendError> {
		let request = self
			.authorized(request)
			.await
			.header("Prefer", "return=representation")
			.header("Accept", SINGLE_OBJECT);
		let response = checked(request.send().await?).await?;
		Ok(response.json::<Value>().await?)
	}

	async fn open_session(
		&self,
		response: Response,
		fallback_email: &str,
	) -> Result<AuthSession, BackendError> {
		let token: TokenResponse = checked(response).await?.json().await?;
		let (Some(access_token), Some(user)) = (token.access_token, token.user) else {
			return Err(BackendError::Rejected("email confirmation required before signing in".to_string()));
		};
		let session = AuthSession {
			access_token,
			user_id: user.id,
			email: user.email.unwrap_or_else(|| fallback_email.to_string()),
		};
		*self.session.write().await = Some(session.clone());
		Ok(session)
	}
}

/// Renders the `select` parameter, e.g. `*,author:profiles(*),comments(*,author:profiles(*))`.
pub(crate) fn render_columns(embeds: &[Embed]) -> String {
	let mut columns = String::from("*");
	for embed in embeds {
		columns.push(',');
		if embed.alias != embed.table.as_str() {
			columns.push_str(embed.alias);
			columns.push(':');
		}
		columns.push_str(embed.table.as_str());
		columns.push('(');
		columns.push_str(&render_columns(&embed.nested));
		columns.push(')');
	}
	columns
}

/// Double-quotes a value so commas and parentheses survive inside `or=(...)`.
fn quote(value: &str) -> String {
	format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub(crate) fn render_filter(filter: &Filter) -> (String, String) {
	match filter {
		Filter::Eq { column, value } => (column.to_string(), format!("eq.{value}")),
		Filter::ILikeAny { columns, needle } => {
			let pattern = quote(&format!("*{needle}*"));
			let clauses: Vec<String> = columns.iter().map(|column| format!("{column}.ilike.{pattern}")).collect();
			("or".to_string(), format!("({})", clauses.join(",")))
		}
	}
}

fn render_order(order: &Order) -> String {
	format!("{}.{}", order.column, if order.ascending { "asc" } else { "desc" })
}

/// Embedded child collections come back in creation order.
fn child_orders(
	embeds: &[Embed],
	prefix: &str,
	params: &mut Vec<(String, String)>,
) {
	for embed in embeds {
		let path = format!("{prefix}{}", embed.alias);
		if matches!(embed.link, Link::Children { .. }) {
			params.push((format!("{path}.order"), render_order(&Order::asc("created_at"))));
		}
		child_orders(&embed.nested, &format!("{path}."), params);
	}
}

pub(crate) fn render_query(query: &Select) -> Vec<(String, String)> {
	let mut params = vec![("select".to_string(), render_columns(&query.embeds))];
	params.extend(query.filters.iter().map(render_filter));
	if let Some(order) = &query.order {
		params.push(("order".to_string(), render_order(order)));
	}
	child_orders(&query.embeds, "", &mut params);
	params
}

fn returning(embeds: &[Embed]) -> Vec<(String, String)> {
	let mut params = vec![("select".to_string(), render_columns(embeds))];
	child_orders(embeds, "", &mut params);
	params
}

/// Maps a non-success response body onto the backend error taxonomy.
pub(crate) fn classify(
	status: StatusCode,
	body: &Value,
) -> BackendError {
	let field = |name: &str| body.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
	let code = field("code");
	let message = ["message", "msg", "error_description", "error"]
		.iter()
		.map(|name| field(*name))
		.find(|message| !message.is_empty())
		.unwrap_or_else(|| status.to_string());

	if code == "23505" || status == StatusCode::CONFLICT || message.contains("already registered") {
		return BackendError::Conflict(message);
	}
	if field("error") == "invalid_grant" || code == "invalid_credentials" || message.contains("Invalid login credentials") {
		return BackendError::InvalidCredentials;
	}
	if code == "PGRST116" {
		return BackendError::NotFound;
	}
	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
		_ => BackendError::Rejected(message),
	}
}

async fn checked(response: Response) -> Result<Response, BackendError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	let body = response.json::<Value>().await.unwrap_or(Value::Null);
	let error = classify(status, &body);
	tracing::debug!(%status, %body, "service rejected request");
	Err(error)
}

#[async_trait]
impl Backend for RestBackend {
	#[instrument(skip(self), fields(table = query.table.as_str()))]
	async fn select(
		&self,
		query: &Select,
	) -> Result<Vec<Value>, BackendError> {
		let request = self.client.get(self.table_url(query.table)).query(&render_query(query));
		let response = checked(self.authorized(request).await.send().await?).await?;
		Ok(response.json::<Vec<Value>>().await?)
	}

	#[instrument(skip(self, table, record, embeds), fields(table = table.as_str()))]
	async fn insert(
		&self,
		table: Table,
		record: Value,
		embeds: &[Embed],
	) -> Result<Value, BackendError> {
		let request = self.client.post(self.table_url(table)).query(&returning(embeds)).json(&json!([record]));
		self.single(request).await
	}

	#[instrument(skip(self, table, patch, embeds), fields(table = table.as_str()))]
	async fn update(
		&self,
		table: Table,
		patch: Value,
		matching: &Filter,
		embeds: &[Embed],
	) -> Result<Value, BackendError> {
		let mut params = vec![render_filter(matching)];
		params.extend(returning(embeds));
		let request = self.client.patch(self.table_url(table)).query(&params).json(&patch);
		self.single(request).await
	}

	#[instrument(skip(self, table), fields(table = table.as_str()))]
	async fn delete(
		&self,
		table: Table,
		matching: &Filter,
	) -> Result<(), BackendError> {
		let request = self
			.client
			.delete(self.table_url(table))
			.query(&[render_filter(matching), ("select".to_string(), "id".to_string())])
			.header("Prefer", "return=representation");
		let response = checked(self.authorized(request).await.send().await?).await?;
		// rows hidden by row level security are silently skipped by the service
		let deleted = response.json::<Vec<Value>>().await?;
		if deleted.is_empty() {
			return Err(BackendError::NotFound);
		}
		Ok(())
	}

	#[instrument(skip(self, password))]
	async fn sign_in(
		&self,
		email: &str,
		password: &str,
	) -> Result<AuthSession, BackendError> {
		let request = self
			.client
			.post(self.auth_url("token"))
			.query(&[("grant_type", "password")])
			.header("apikey", &self.anon_key)
			.json(&json!({ "email": email, "password": password }));
		self.open_session(request.send().await?, email).await
	}

	#[instrument(skip(self, password))]
	async fn sign_up(
		&self,
		username: &str,
		email: &str,
		password: &str,
	) -> Result<AuthSession, BackendError> {
		let request = self.client.post(self.auth_url("signup")).header("apikey", &self.anon_key).json(&json!({
			"email": email,
			"password": password,
			"data": { "username": username },
		}));
		self.open_session(request.send().await?, email).await
	}

	async fn sign_out(&self) -> Result<(), BackendError> {
		let Some(session) = self.session.read().await.clone() else {
			return Ok(());
		};
		let request = self
			.client
			.post(self.auth_url("logout"))
			.header("apikey", &self.anon_key)
			.bearer_auth(&session.access_token);
		let result = match request.send().await {
			Ok(response) => checked(response).await.map(|_| ()),
			Err(err) => Err(err.into()),
		};
		// the token is dropped locally whatever the service answered
		*self.session.write().await = None;
		result
	}

	async fn current_session(&self) -> Option<AuthSession> {
		self.session.read().await.clone()
	}
}

#[cfg(test)]
mod test {
	use reqwest::StatusCode;
	use serde_json::json;
	use wiremock::{
		matchers::{body_json, header, method, path, query_param},
		Mock, MockServer, ResponseTemplate,
	};

	use super::{classify, render_columns, render_query, RestBackend};
	use crate::adapters::backend::{Backend, BackendError, Embed, Filter, Order, Select, Table};

	fn post_listing() -> Select {
		Select::on(Table::Posts)
			.embed(Embed::parent("author", Table::Profiles, "author_id"))
			.embed(Embed::parent("category", Table::Categories, "category_id"))
			.embed(Embed::children("comments", Table::Comments, "post_id").with(Embed::parent("author", Table::Profiles, "author_id")))
			.filter(Filter::eq("category_id", "tech"))
			.filter(Filter::ILikeAny {
				columns: vec!["title", "content"],
				needle: "rust".to_string(),
			})
			.order(Order::desc("created_at"))
	}

	#[test]
	fn test_render_columns_with_aliases_and_nesting() {
		assert_eq!(
			render_columns(&post_listing().embeds),
			"*,author:profiles(*),category:categories(*),comments(*,author:profiles(*))"
		);
	}

	#[test]
	fn test_render_query_follows_postgrest_grammar() {
		let params = render_query(&post_listing());

		assert_eq!(
			params[1..],
			[
				("category_id".to_string(), "eq.tech".to_string()),
				("or".to_string(), "(title.ilike.\"*rust*\",content.ilike.\"*rust*\")".to_string()),
				("order".to_string(), "created_at.desc".to_string()),
				("comments.order".to_string(), "created_at.asc".to_string()),
			]
		);
	}

	#[test]
	fn test_search_needle_is_quoted() {
		let (_, value) = super::render_filter(&Filter::ILikeAny {
			columns: vec!["title"],
			needle: "a,\"b\")".to_string(),
		});

		assert_eq!(value, "(title.ilike.\"*a,\\\"b\\\")*\")");
	}

	#[test]
	fn test_classify_service_errors() {
		assert!(matches!(
			classify(StatusCode::CONFLICT, &json!({"code": "23505", "message": "duplicate key"})),
			BackendError::Conflict(_)
		));
		assert!(matches!(
			classify(StatusCode::BAD_REQUEST, &json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
			BackendError::InvalidCredentials
		));
		assert!(matches!(
			classify(StatusCode::NOT_ACCEPTABLE, &json!({"code": "PGRST116", "message": "JSON object requested"})),
			BackendError::NotFound
		));
		assert!(matches!(
			classify(StatusCode::FORBIDDEN, &json!({"code": "42501", "message": "row-level security"})),
			BackendError::Unauthorized(_)
		));
		assert!(matches!(classify(StatusCode::INTERNAL_SERVER_ERROR, &json!(null)), BackendError::Rejected(_)));
	}

	#[tokio::test]
	async fn test_select_sends_api_key_and_query() {
		'_given: {
			let server = MockServer::start().await;
			Mock::given(method("GET"))
				.and(path("/rest/v1/categories"))
				.and(query_param("order", "name.asc"))
				.and(header("apikey", "anon"))
				.and(header("authorization", "Bearer anon"))
				.respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "tech", "name": "Technology"}])))
				.mount(&server)
				.await;
			let backend = RestBackend::new(server.uri(), "anon");

			'_when: {
				let rows = backend.select(&Select::on(Table::Categories).order(Order::asc("name"))).await.unwrap();

				assert_eq!(rows.len(), 1);
				assert_eq!(rows[0]["name"], "Technology");
			}
		}
	}

	#[tokio::test]
	async fn test_sign_in_keeps_token_for_later_requests() {
		'_given: {
			let server = MockServer::start().await;
			Mock::given(method("POST"))
				.and(path("/auth/v1/token"))
				.and(query_param("grant_type", "password"))
				.and(body_json(json!({"email": "ferris@example.com", "password": "crab-rave"})))
				.respond_with(ResponseTemplate::new(200).set_body_json(json!({
					"access_token": "user-token",
					"user": {"id": "u1", "email": "ferris@example.com"}
				})))
				.mount(&server)
				.await;
			Mock::given(method("DELETE"))
				.and(path("/rest/v1/posts"))
				.and(query_param("id", "eq.p1"))
				.and(header("authorization", "Bearer user-token"))
				.and(header("prefer", "return=representation"))
				.respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "p1"}])))
				.mount(&server)
				.await;
			let backend = RestBackend::new(server.uri(), "anon");

			'_when: {
				let session = backend.sign_in("ferris@example.com", "crab-rave").await.unwrap();
				assert_eq!(session.user_id, "u1");

				backend.delete(Table::Posts, &Filter::id("p1")).await.unwrap();
				assert_eq!(backend.current_session().await, Some(session));
			}
		}
	}

	#[tokio::test]
	async fn test_delete_of_no_visible_row_is_not_found() {
		'_given: {
			let server = MockServer::start().await;
			Mock::given(method("DELETE"))
				.and(path("/rest/v1/posts"))
				.and(query_param("id", "eq.p9"))
				.respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
				.mount(&server)
				.await;
			let backend = RestBackend::new(server.uri(), "anon");

			'_when: {
				let result = backend.delete(Table::Posts, &Filter::id("p9")).await;

				assert!(matches!(result, Err(BackendError::NotFound)));
			}
		}
	}

	#[tokio::test]
	async fn test_sign_in_with_wrong_password() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/auth/v1/token"))
			.respond_with(ResponseTemplate::new(400).set_body_json(json!({
				"error": "invalid_grant",
				"error_description": "Invalid login credentials"
			})))
			.mount(&server)
			.await;
		let backend = RestBackend::new(server.uri(), "anon");

		let result = backend.sign_in("ferris@example.com", "wrong").await;

		assert!(matches!(result, Err(BackendError::InvalidCredentials)));
		assert!(backend.current_session().await.is_none());
	}
}
