//! SQLite database module for the booking engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
