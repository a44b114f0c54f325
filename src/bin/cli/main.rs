pub mod commands;

use std::process::ExitCode;

use blogspace::{
	bootstrap::Bootstrap,
	dependencies::{config, rest_backend},
	services::notification::{Notification, NotificationLevel},
};
use clap::Parser;
use tokio::sync::broadcast::Receiver;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints pending notifications and returns how many there were.
fn flush(notifications: &mut Receiver<Notification>) -> usize {
	let mut printed = 0;
	while let Ok(notification) = notifications.try_recv() {
		match notification.level {
			NotificationLevel::Success => eprintln!("✓ {}", notification.message),
			NotificationLevel::Error => eprintln!("✗ {}", notification.message),
		}
		printed += 1;
	}
	printed
}

#[tokio::main]
async fn main() -> ExitCode {
	let cli = commands::Cli::parse();

	let config = match config() {
		Ok(config) => config,
		Err(err) => {
			eprintln!("{}", err);
			return ExitCode::FAILURE;
		}
	};

	// ! Tracing
	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.as_str().into()))
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let backend = match rest_backend() {
		Ok(backend) => backend,
		Err(err) => {
			eprintln!("{}", err);
			return ExitCode::FAILURE;
		}
	};

	let app = Bootstrap::app(backend, config.page_size);
	let mut notifications = app.notifier.subscribe();
	Bootstrap::load(&app).await;
	flush(&mut notifications);

	let result = commands::run(cli, &app).await;
	let printed = flush(&mut notifications);
	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			if printed == 0 {
				eprintln!("✗ {}", err);
			}
			ExitCode::FAILURE
		}
	}
}
