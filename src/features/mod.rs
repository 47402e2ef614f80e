// Bot features
pub mod ambient;
pub mod poster;
pub mod scheduler;
pub mod store;
