//! PostgreSQL repository adapters.

mod donation_repository;
mod donor_repository;
mod subscription_repository;

pub use donation_repository::PostgresDonationRepository;
pub use donor_repository::PostgresDonorRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
