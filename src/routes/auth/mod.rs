pub mod claims;
pub mod google_login;

pub use google_login::{google_callback, google_login};
