// Data models
pub mod channel;
