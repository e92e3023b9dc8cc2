pub mod diagnostic_repository;
pub mod memory_signup_repository;
pub mod mock_db;
pub mod postgres_diagnostic_repository;
pub mod postgres_signup_repository;
pub mod ring_buffer;
pub mod signup_repository;
