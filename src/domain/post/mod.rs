pub mod commands;
pub mod criteria;
pub mod entity;
pub mod image;

pub use commands::{CreatePost, UpdatePost};
pub use criteria::SearchCriteria;
pub use entity::{Comment, Post};
pub use image::FeaturedImage;
