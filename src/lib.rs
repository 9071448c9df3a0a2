pub mod api_client;
pub mod config;
pub mod debouncer;
pub mod lazy_image;
pub mod search;
pub mod state;
pub mod ui;
pub mod utils;
