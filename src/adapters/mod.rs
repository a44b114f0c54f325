pub mod backend;
pub mod repositories;
