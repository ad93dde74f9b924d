//! Adapters module - Implementations of the ports against real
//! infrastructure (Postgres, HTTP, payment providers) and test doubles.

pub mod events;
pub mod gateways;
pub mod http;
pub mod memory;
pub mod postgres;
