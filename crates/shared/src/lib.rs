//! Faramita Shared - Wire types for the HTTP API
//!
//! This crate contains the JSON request and response bodies exchanged with the
//! engine's `/api` routes.
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json and the domain vocabulary
//! 2. **No business logic** - Pure data types and conversions

pub mod requests;
pub mod responses;

pub use requests::{ChatRequest, RollRequest};
pub use responses::{
    ActiveCharacterDto, ChapterSummaryDto, ChatResponse, ErrorResponse, HistoryEntryDto,
    PendingCheckDto, RollOutcomeDto, RollResultDto, WorldSummaryDto,
};
