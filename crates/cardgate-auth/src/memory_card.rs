//! In-memory card reader
//!
//! Simulates a reader and a seated card for tests and demos. Clones share the
//! same underlying card, so a test can hand one clone to an engine and keep
//! another to insert, remove, or corrupt the card between polls.

use std::sync::Arc;

use async_trait::async_trait;
use cardgate_core::{CardSummary, MAX_LONG_VALUE_BYTES};
use tokio::sync::RwLock;

use crate::error::CardError;
use crate::reader::CardReader;

#[derive(Debug, Clone, Default)]
enum Seated {
    #[default]
    Empty,
    /// Card inserted backwards or otherwise unreadable
    Unreadable,
    Card {
        short_value: Option<String>,
        long_value: Vec<u8>,
        write_protected: bool,
    },
}

#[derive(Debug, Default)]
struct MemoryCardState {
    seated: Seated,
    reader_fault: Option<String>,
    fail_writes: bool,
    corrupt_long_writes: bool,
}

/// Simulated card reader backed by shared memory
#[derive(Debug, Clone, Default)]
pub struct MemoryCard {
    state: Arc<RwLock<MemoryCardState>>,
}

impl MemoryCard {
    /// Create a reader with no card inserted
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat a card carrying the given payloads
    pub async fn insert_card(&self, short_value: Option<&str>, long_value: &[u8]) {
        self.seat(short_value, long_value, false).await;
    }

    /// Seat a write-protected card
    pub async fn insert_write_protected_card(&self, short_value: Option<&str>, long_value: &[u8]) {
        self.seat(short_value, long_value, true).await;
    }

    /// Seat a card the reader cannot talk to
    pub async fn insert_backward_card(&self) {
        self.state.write().await.seated = Seated::Unreadable;
    }

    pub async fn remove_card(&self) {
        self.state.write().await.seated = Seated::Empty;
    }

    /// Make every reader call fail until cleared with `None`
    pub async fn set_reader_fault(&self, fault: Option<&str>) {
        self.state.write().await.reader_fault = fault.map(str::to_string);
    }

    /// Make every write fail with a reader fault
    pub async fn fail_writes(&self, fail: bool) {
        self.state.write().await.fail_writes = fail;
    }

    /// Flip a bit in every long payload written, so readback differs
    pub async fn corrupt_long_writes(&self, corrupt: bool) {
        self.state.write().await.corrupt_long_writes = corrupt;
    }

    pub async fn short_value(&self) -> Option<String> {
        match &self.state.read().await.seated {
            Seated::Card { short_value, .. } => short_value.clone(),
            Seated::Empty | Seated::Unreadable => None,
        }
    }

    pub async fn long_value(&self) -> Vec<u8> {
        match &self.state.read().await.seated {
            Seated::Card { long_value, .. } => long_value.clone(),
            Seated::Empty | Seated::Unreadable => Vec::new(),
        }
    }

    pub async fn is_write_protected(&self) -> bool {
        matches!(
            self.state.read().await.seated,
            Seated::Card {
                write_protected: true,
                ..
            }
        )
    }

    async fn seat(&self, short_value: Option<&str>, long_value: &[u8], write_protected: bool) {
        self.state.write().await.seated = Seated::Card {
            short_value: short_value.map(str::to_string),
            long_value: long_value.to_vec(),
            write_protected,
        };
    }

    /// Apply a write to the seated card after the common checks
    async fn write<F>(&self, short_write: bool, apply: F) -> Result<(), CardError>
    where
        F: FnOnce(&mut Option<String>, &mut Vec<u8>, bool),
    {
        let mut state = self.state.write().await;
        if let Some(fault) = &state.reader_fault {
            return Err(CardError::ReaderFault(fault.clone()));
        }
        if state.fail_writes {
            return Err(CardError::ReaderFault("write failed".to_string()));
        }
        let corrupt = state.corrupt_long_writes;
        match &mut state.seated {
            Seated::Empty => Err(CardError::NoCard),
            Seated::Unreadable => Err(CardError::ReaderFault("card unreadable".to_string())),
            Seated::Card {
                short_value,
                long_value,
                write_protected,
            } => {
                if short_write && *write_protected {
                    return Err(CardError::WriteProtected);
                }
                apply(short_value, long_value, corrupt);
                Ok(())
            }
        }
    }
}

fn check_capacity(value: &[u8]) -> Result<(), CardError> {
    if value.len() > MAX_LONG_VALUE_BYTES {
        return Err(CardError::CapacityExceeded {
            size: value.len(),
            capacity: MAX_LONG_VALUE_BYTES,
        });
    }
    Ok(())
}

fn store_long(target: &mut Vec<u8>, value: &[u8], corrupt: bool) {
    *target = value.to_vec();
    if corrupt {
        if let Some(first) = target.first_mut() {
            *first ^= 0x01;
        }
    }
}

fn short_or_none(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[async_trait]
impl CardReader for MemoryCard {
    async fn read_summary(&self) -> Result<CardSummary, CardError> {
        let state = self.state.read().await;
        if let Some(fault) = &state.reader_fault {
            return Err(CardError::ReaderFault(fault.clone()));
        }
        Ok(match &state.seated {
            Seated::Empty => CardSummary::NoCard,
            Seated::Unreadable => CardSummary::Error,
            Seated::Card {
                short_value,
                long_value,
                ..
            } => CardSummary::ready(short_value.clone(), !long_value.is_empty()),
        })
    }

    async fn read_long_value(&self) -> Result<Vec<u8>, CardError> {
        let state = self.state.read().await;
        if let Some(fault) = &state.reader_fault {
            return Err(CardError::ReaderFault(fault.clone()));
        }
        match &state.seated {
            Seated::Empty => Err(CardError::NoCard),
            Seated::Unreadable => Err(CardError::ReaderFault("card unreadable".to_string())),
            Seated::Card { long_value, .. } => Ok(long_value.clone()),
        }
    }

    async fn override_write_protection(&self) -> Result<(), CardError> {
        let mut state = self.state.write().await;
        match &mut state.seated {
            Seated::Card {
                write_protected, ..
            } => {
                *write_protected = false;
                Ok(())
            }
            Seated::Empty => Err(CardError::NoCard),
            Seated::Unreadable => Err(CardError::ReaderFault("card unreadable".to_string())),
        }
    }

    async fn write_short_value(&self, value: &str) -> Result<(), CardError> {
        let value = short_or_none(value);
        self.write(true, move |short, _, _| *short = value).await
    }

    async fn write_short_and_long_values(
        &self,
        short_value: &str,
        long_value: &[u8],
    ) -> Result<(), CardError> {
        check_capacity(long_value)?;
        let value = short_or_none(short_value);
        self.write(true, move |short, long, corrupt| {
            *short = value;
            store_long(long, long_value, corrupt);
        })
        .await
    }

    async fn write_long_value(&self, value: &[u8]) -> Result<(), CardError> {
        check_capacity(value)?;
        self.write(false, move |_, long, corrupt| store_long(long, value, corrupt))
            .await
    }
}
