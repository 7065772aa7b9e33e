pub mod config;
pub mod document;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;
pub mod utils;

pub use config::Settings;
pub use router::build_router;
pub use state::AppState;
