// Slash commands
pub mod ambient;
pub mod help;
