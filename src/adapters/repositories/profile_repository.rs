use crate::{
	adapters::backend::{Filter, Select, Table},
	domain::profile::Profile,
	services::response::ServiceError,
};

use super::Repository;

impl Repository<Profile> {
	pub async fn find(
		&self,
		id: &str,
	) -> Result<Option<Profile>, ServiceError> {
		let query = Select::on(Table::Profiles).filter(Filter::id(id));
		let mut profiles = Self::decode_all(self.backend.select(&query).await?)?;
		Ok(profiles.pop())
	}
}
