pub mod app;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod period;
pub mod selection;
pub mod session;
pub mod source;
pub mod ui;
pub mod view;
pub mod state;

pub use app::router;
pub use client::ApiClient;
pub use config::Config;
pub use state::AppState;
