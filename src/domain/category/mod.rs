use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Category {
	pub id: String,
	pub name: String,
	pub slug: String,
	pub created_at: DateTime<Utc>,
}
