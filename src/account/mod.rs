//! Account domain: models and repository

pub mod models;
pub mod repository;

pub use models::{Account, AccountStatus};
pub use repository::AccountRepository;
