pub mod db;
pub mod json_store;
pub mod models;

pub use rusqlite;
