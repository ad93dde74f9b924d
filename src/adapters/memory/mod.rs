//! In-memory repository adapters for tests.

mod donation_repository;
mod donor_repository;
mod subscription_repository;

pub use donation_repository::InMemoryDonationRepository;
pub use donor_repository::InMemoryDonorRepository;
pub use subscription_repository::InMemorySubscriptionRepository;
