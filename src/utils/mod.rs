pub mod admin;
pub mod intent;
pub mod jwt;
