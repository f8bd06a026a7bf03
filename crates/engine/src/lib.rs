//! Faramita Engine library.
//!
//! This crate contains the server side of the Faramita game-master chat.
//!
//! ## Structure
//!
//! - `use_cases/` - Chat turns, dice, prompt assembly and structured replies
//! - `stores/` - In-memory chronicle and world state
//! - `infrastructure/` - Configuration, completions client, template loading, ports
//! - `api/` - HTTP entry points and the chat page
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

pub use app::App;
