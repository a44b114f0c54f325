use crate::{
	adapters::backend::{Order, Select, Table},
	domain::category::Category,
	services::response::ServiceError,
};

use super::Repository;

impl Repository<Category> {
	/// Every category, by name.
	pub async fn list(&self) -> Result<Vec<Category>, ServiceError> {
		let query = Select::on(Table::Categories).order(Order::asc("name"));
		Self::decode_all(self.backend.select(&query).await?)
	}
}
