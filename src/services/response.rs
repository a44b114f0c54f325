use std::fmt::Display;

use crate::adapters::backend::BackendError;

#[derive(Debug)]
pub enum ServiceError {
	Unauthorized(String),
	ValidationError(String),
	EntityNotFound,
	DuplicateUsername(String),
	InvalidCredentials,
	DeserializationError(String),
	BackendError(BackendError),
	ConfigError(String),
}

impl std::error::Error for ServiceError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ServiceError::BackendError(err) => Some(err),
			_ => None,
		}
	}
}

impl Display for ServiceError {
	fn fmt(
		&self,
		f: &mut std::fmt::Formatter<'_>,
	) -> std::fmt::Result {
		match self {
			ServiceError::Unauthorized(res) => write!(f, "{}", res),
			ServiceError::ValidationError(res) => write!(f, "{}", res),
			ServiceError::EntityNotFound => write!(f, "EntityNotFound"),
			ServiceError::DuplicateUsername(username) => write!(f, "Username '{}' is already taken", username),
			ServiceError::InvalidCredentials => write!(f, "Invalid email or password"),
			ServiceError::DeserializationError(res) => write!(f, "{}", res),
			ServiceError::BackendError(err) => write!(f, "{}", err),
			ServiceError::ConfigError(res) => write!(f, "{}", res),
		}
	}
}

impl From<BackendError> for ServiceError {
	fn from(value: BackendError) -> Self {
		match value {
			BackendError::InvalidCredentials => ServiceError::InvalidCredentials,
			BackendError::NotFound => ServiceError::EntityNotFound,
			other => ServiceError::BackendError(other),
		}
	}
}

impl From<serde_json::Error> for ServiceError {
	fn from(value: serde_json::Error) -> Self {
		ServiceError::DeserializationError(value.to_string())
	}
}
