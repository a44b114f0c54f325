pub(crate) mod category_repository;
pub(crate) mod comment_repository;
pub(crate) mod post_repository;
pub(crate) mod profile_repository;

use std::{marker::PhantomData, sync::Arc};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{adapters::backend::Backend, services::response::ServiceError};

/// Typed access to one table of the backend.
pub struct Repository<E> {
	pub backend: Arc<dyn Backend>,
	pub _phantom: PhantomData<E>,
}

impl<E> Repository<E> {
	pub fn new(backend: Arc<dyn Backend>) -> Self {
		Self {
			backend,
			_phantom: Default::default(),
		}
	}
}

impl<E> Clone for Repository<E> {
	fn clone(&self) -> Self {
		Self::new(self.backend.clone())
	}
}

impl<E: DeserializeOwned> Repository<E> {
	fn decode(record: Value) -> Result<E, ServiceError> {
		Ok(serde_json::from_value(record)?)
	}

	fn decode_all(records: Vec<Value>) -> Result<Vec<E>, ServiceError> {
		records.into_iter().map(Self::decode).collect()
	}
}
