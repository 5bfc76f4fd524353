pub mod app;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod services;

pub use app::App;
pub use config::Config;
pub use error::{AppError, Result};
pub use scheduler::{RunOutcome, Scheduler};
