//! Card reader adapter seam
//!
//! The reader is a black box yielding a `CardSummary` per poll plus raw
//! read/write primitives over the card's short and long payloads. Chip
//! protocols and drivers live behind implementations of this trait.

use async_trait::async_trait;
use cardgate_core::{decode_long_payload, CardSummary};
use serde::de::DeserializeOwned;

use crate::error::{CardError, Result};

/// Trait for physical or simulated smart-card readers
#[async_trait]
pub trait CardReader: Send + Sync {
    /// Snapshot the reader and the seated card's short payload
    async fn read_summary(&self) -> std::result::Result<CardSummary, CardError>;

    /// Read the long payload region (empty if nothing is stored)
    async fn read_long_value(&self) -> std::result::Result<Vec<u8>, CardError>;

    /// Clear the card's write protection so the short payload can be rewritten
    async fn override_write_protection(&self) -> std::result::Result<(), CardError>;

    /// Write the short payload, leaving the long payload untouched
    async fn write_short_value(&self, value: &str) -> std::result::Result<(), CardError>;

    /// Write both payloads together
    async fn write_short_and_long_values(
        &self,
        short_value: &str,
        long_value: &[u8],
    ) -> std::result::Result<(), CardError>;

    /// Write the long payload, leaving the short payload untouched
    async fn write_long_value(&self, value: &[u8]) -> std::result::Result<(), CardError>;
}

/// Read and decode the long payload as `T`
pub async fn read_long_object<T, R>(card: &R) -> Result<Option<T>>
where
    T: DeserializeOwned,
    R: CardReader + ?Sized,
{
    let bytes = card.read_long_value().await?;
    Ok(decode_long_payload(&bytes)?)
}
