//! Smart Bookmark text UI.
//!
//! `render` draws a view snapshot as plain text; `console` drives a mounted
//! view from line-based input. The JSON-RPC bridge in `rpc_server` is the
//! other surface, for external UI shells.

pub mod console;
pub mod render;
