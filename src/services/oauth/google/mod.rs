pub mod client;
pub mod errors;
pub mod mock_google_oauth;
pub mod service;
