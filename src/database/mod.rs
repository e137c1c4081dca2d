//! Smart Bookmark local database layer.
//!
//! The only local state the app keeps is the provider session; it lives in a
//! small SQLite file alongside its schema migrations.
//!
//! # Usage
//!
//! ```no_run
//! use smart_bookmark::database::Database;
//!
//! let db = Database::open("smart-bookmark.db").expect("failed to open database");
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
