//! Cardgate Auth - Smart-card authentication engines
//!
//! This crate provides:
//! - The `CardReader` adapter seam, with in-memory and file-backed readers
//! - The dipped-card engine (PIN, then withdraw the card to finish login)
//! - The inserted-card engine (the card stays seated for the whole session)
//! - Auth event logging and engine configuration
//!
//! Engines are driven by a host that polls `get_auth_status` on a fixed
//! interval and issues commands between polls. Calls must be serialized; every
//! command takes `&mut self`.

pub mod config;
pub mod dipped;
mod engine;
pub mod error;
pub mod events;
pub mod file_card;
pub mod inserted;
pub mod memory_card;
pub mod reader;

pub use config::AuthConfig;
pub use dipped::{DippedCardAuth, ProgramCardInput, ProgramCardOutcome};
pub use error::{AuthError, CardError, Result};
pub use file_card::{FileCard, MockCardFile, MockCardStatus};
pub use inserted::InsertedCardAuth;
pub use memory_card::MemoryCard;
pub use reader::CardReader;
