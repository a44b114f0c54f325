use std::sync::{Arc, OnceLock};

use crate::{
	adapters::backend::{Backend, RestBackend},
	config::Config,
	services::response::ServiceError,
};

pub fn config() -> Result<&'static Config, ServiceError> {
	static CONFIG: OnceLock<Config> = OnceLock::new();
	let config = match CONFIG.get() {
		None => {
			let config = Config::new()?;

			CONFIG.get_or_init(|| config)
		}
		Some(config) => config,
	};
	Ok(config)
}

/// HTTP backend for the configured service.
pub fn rest_backend() -> Result<Arc<dyn Backend>, ServiceError> {
	let config = config()?;
	Ok(Arc::new(RestBackend::new(&config.backend_url, &config.backend_anon_key)))
}
