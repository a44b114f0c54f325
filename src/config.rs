use crate::{domain::pagination::DEFAULT_PAGE_SIZE, services::response::ServiceError};

pub struct Config {
	/// Which errors we want to log
	pub log_level: String,

	/// Base URL of the hosted backend
	pub backend_url: String,
	pub backend_anon_key: String,
	pub page_size: usize,
}

fn required(name: &str) -> Result<String, ServiceError> {
	std::env::var(name).map_err(|_| ServiceError::ConfigError(format!("{name} must be set")))
}

impl Config {
	pub fn new() -> Result<Config, ServiceError> {
		dotenv::dotenv().ok();
		let backend_url = required("BACKEND_URL")?;
		let backend_anon_key = required("BACKEND_ANON_KEY")?;
		let log_level = std::env::var("LOG_LEVEL").unwrap_or("warn".to_string());
		let page_size = match std::env::var("PAGE_SIZE") {
			Ok(raw) => match raw.parse::<usize>() {
				Ok(size) if size > 0 => size,
				_ => return Err(ServiceError::ConfigError(format!("PAGE_SIZE must be a positive integer, got '{raw}'"))),
			},
			Err(_) => DEFAULT_PAGE_SIZE,
		};

		Ok(Config {
			log_level,
			backend_url,
			backend_anon_key,
			page_size,
		})
	}
}
