pub mod commands;
pub mod handlers;
pub mod query;
pub mod store;
