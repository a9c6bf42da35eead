pub mod analytics;
pub mod events;
pub mod health;
