//! Domain layer - Entities, value objects, and the gateway orchestration
//! logic. No I/O; everything external comes in through the ports.

pub mod donation;
pub mod foundation;
pub mod gateway;
pub mod subscription;
