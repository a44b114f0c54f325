use std::path::PathBuf;

use blogspace::{
	bootstrap::App,
	domain::post::{CreatePost, FeaturedImage, Post, UpdatePost},
	services::response::ServiceError,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blogspace", about = "Browse, search and publish BlogSpace posts")]
pub struct Cli {
	#[arg(long, env = "BLOGSPACE_EMAIL", global = true)]
	pub email: Option<String>,

	#[arg(long, env = "BLOGSPACE_PASSWORD", global = true, hide_env_values = true)]
	pub password: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
	/// List categories
	Categories,
	/// List posts, newest first
	List {
		#[arg(long)]
		search: Option<String>,
		/// Category slug or id
		#[arg(long)]
		category: Option<String>,
		#[arg(long, default_value_t = 1)]
		page: usize,
	},
	/// Show a post with its comments
	Show { id: String },
	Create {
		#[arg(long)]
		title: String,
		#[arg(long)]
		excerpt: String,
		#[arg(long, conflicts_with = "content_file", required_unless_present = "content_file")]
		content: Option<String>,
		#[arg(long)]
		content_file: Option<PathBuf>,
		#[arg(long)]
		category: Option<String>,
		/// Local image embedded as the featured image
		#[arg(long)]
		image: Option<PathBuf>,
	},
	Edit {
		id: String,
		#[arg(long)]
		title: Option<String>,
		#[arg(long)]
		excerpt: Option<String>,
		#[arg(long, conflicts_with = "content_file")]
		content: Option<String>,
		#[arg(long)]
		content_file: Option<PathBuf>,
		#[arg(long)]
		category: Option<String>,
		#[arg(long)]
		image: Option<PathBuf>,
	},
	Delete { id: String },
	Comment { id: String, text: String },
	/// Create an account using --email and --password
	Register {
		#[arg(long)]
		username: String,
	},
}

async fn resolve_category(
	app: &App,
	key: &str,
) -> Result<String, ServiceError> {
	app.content
		.categories()
		.await
		.into_iter()
		.find(|category| category.slug == key || category.id == key)
		.map(|category| category.id)
		.ok_or_else(|| ServiceError::ValidationError(format!("Unknown category '{key}'")))
}

async fn read_content(
	content: Option<String>,
	file: Option<PathBuf>,
) -> Result<Option<String>, ServiceError> {
	match (content, file) {
		(Some(content), _) => Ok(Some(content)),
		(None, Some(path)) => tokio::fs::read_to_string(&path)
			.await
			.map(Some)
			.map_err(|err| ServiceError::ValidationError(format!("cannot read {}: {}", path.display(), err))),
		(None, None) => Ok(None),
	}
}

async fn image(path: Option<PathBuf>) -> Result<Option<String>, ServiceError> {
	match path {
		Some(path) => Ok(Some(FeaturedImage::from_path(path).await?)),
		None => Ok(None),
	}
}

/// Edit and delete are only offered on the signed-in user's own posts.
async fn own_post(
	app: &App,
	id: &str,
) -> Result<Post, ServiceError> {
	let user = app
		.session
		.current_user()
		.await
		.ok_or_else(|| ServiceError::Unauthorized("You must be logged in".to_string()))?;
	let post = app.content.get_post_by_id(id).await.ok_or(ServiceError::EntityNotFound)?;
	if !post.is_authored_by(&user.id) {
		return Err(ServiceError::Unauthorized("Only the author can change this post".to_string()));
	}
	Ok(post)
}

fn print_summary(post: &Post) {
	println!(
		"{}  {}\n    by {} in {} · {} · {} comment(s)",
		post.id,
		post.title,
		post.author.as_ref().map_or("unknown", |author| author.username.as_str()),
		post.category.as_ref().map_or("uncategorised", |category| category.name.as_str()),
		post.created_at.format("%Y-%m-%d"),
		post.comment_count(),
	);
}

pub async fn run(
	cli: Cli,
	app: &App,
) -> Result<(), ServiceError> {
	if let Command::Register { username } = &cli.command {
		let (Some(email), Some(password)) = (&cli.email, &cli.password) else {
			return Err(ServiceError::ValidationError("register needs --email and --password".to_string()));
		};
		let profile = app.session.register(username, email, password).await?;
		println!("registered {} ({})", profile.username, profile.id);
		return Ok(());
	}
	if let (Some(email), Some(password)) = (&cli.email, &cli.password) {
		app.session.login(email, password).await?;
	}

	match cli.command {
		Command::Categories => {
			for category in app.content.categories().await {
				println!("{}\t{}\t{}", category.slug, category.name, category.id);
			}
		}
		Command::List { search, category, page } => {
			if let Some(category) = category {
				let id = resolve_category(app, &category).await?;
				app.content.set_selected_category(id).await?;
			}
			if let Some(search) = search {
				app.content.set_search_query(search).await?;
			}
			app.content.set_page(page).await;
			let page = app.content.current_page().await;
			for post in &page.items {
				print_summary(post);
			}
			println!(
				"Showing {} of {} posts (page {} of {})",
				page.items.len(),
				page.total_items,
				page.number,
				page.total_pages.max(1)
			);
		}
		Command::Show { id } => {
			let post = app.content.get_post_by_id(&id).await.ok_or(ServiceError::EntityNotFound)?;
			print_summary(&post);
			println!("\n{}\n", post.content);
			for comment in &post.comments {
				let author = comment.author.as_ref().map_or("unknown", |author| author.username.as_str());
				println!("  [{}] {}: {}", comment.created_at.format("%Y-%m-%d %H:%M"), author, comment.content);
			}
		}
		Command::Create {
			title,
			excerpt,
			content,
			content_file,
			category,
			image: image_path,
		} => {
			let category_id = match category {
				Some(key) => Some(resolve_category(app, &key).await?),
				None => None,
			};
			let post = app
				.content
				.create_post(CreatePost {
					title,
					excerpt,
					content: read_content(content, content_file).await?.unwrap_or_default(),
					category_id,
					featured_image: image(image_path).await?,
				})
				.await?;
			println!("{}", post.id);
		}
		Command::Edit {
			id,
			title,
			excerpt,
			content,
			content_file,
			category,
			image: image_path,
		} => {
			own_post(app, &id).await?;
			let category_id = match category {
				Some(key) => Some(resolve_category(app, &key).await?),
				None => None,
			};
			let patch = UpdatePost {
				title,
				excerpt,
				content: read_content(content, content_file).await?,
				category_id,
				featured_image: image(image_path).await?,
			};
			app.content.update_post(&id, patch).await?;
		}
		Command::Delete { id } => {
			own_post(app, &id).await?;
			app.content.delete_post(&id).await?;
		}
		Command::Comment { id, text } => {
			app.content.add_comment(&id, &text).await?;
		}
		Command::Register { .. } => {}
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use clap::Parser;

	use super::{Cli, Command};

	#[test]
	fn test_register_takes_credentials_after_subcommand() {
		let cli = Cli::try_parse_from([
			"blogspace",
			"register",
			"--username",
			"ferris",
			"--email",
			"ferris@example.com",
			"--password",
			"crab-rave",
		])
		.unwrap();

		assert!(matches!(cli.command, Command::Register { ref username } if username == "ferris"));
		assert_eq!(cli.email.as_deref(), Some("ferris@example.com"));
		assert_eq!(cli.password.as_deref(), Some("crab-rave"));
	}

	#[test]
	fn test_create_needs_content_or_file() {
		let missing = Cli::try_parse_from(["blogspace", "create", "--title", "t", "--excerpt", "e"]);

		assert!(missing.is_err());
	}
}
