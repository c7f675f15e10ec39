pub mod entity;
pub mod metrics;
pub mod stream;
pub mod walker;
