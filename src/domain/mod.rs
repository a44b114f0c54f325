pub mod category;
pub mod pagination;
pub mod post;
pub mod profile;
