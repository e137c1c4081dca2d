// Smart Bookmark state managers
// Managers hold application state: the session, the bookmark repository and the view.

pub mod bookmark_repository;
pub mod session_store;
pub mod view_controller;
