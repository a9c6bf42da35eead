//! Background tasks owned by the API process.

pub mod publisher;
