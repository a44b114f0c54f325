use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored identity of a signed-in user, distinct from the credentials.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Profile {
	pub id: String,
	pub username: String,
	#[serde(default)]
	pub avatar_url: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Profile {
	/// Avatar to display, falling back to a generated one seeded by the username.
	pub fn avatar(&self) -> String {
		match &self.avatar_url {
			Some(url) if !url.is_empty() => url.clone(),
			_ => format!("https://api.dicebear.com/7.x/avataaars/svg?seed={}", self.username),
		}
	}
}

#[test]
fn test_avatar_falls_back_to_generated_image() {
	let mut profile: Profile = serde_json::from_value(serde_json::json!({
		"id": "u1",
		"username": "ferris",
		"avatar_url": null,
		"created_at": "2024-01-01T00:00:00Z",
		"updated_at": "2024-01-01T00:00:00Z",
	}))
	.unwrap();
	assert_eq!(profile.avatar(), "https://api.dicebear.com/7.x/avataaars/svg?seed=ferris");

	profile.avatar_url = Some("https://cdn.example.com/ferris.png".to_string());
	assert_eq!(profile.avatar(), "https://cdn.example.com/ferris.png");
}
