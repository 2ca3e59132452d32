//! File-backed mock card reader
//!
//! The reader state lives in a JSON file so a developer can insert, swap, and
//! remove cards from another terminal while a kiosk is polling. A missing file
//! reads as an empty reader. The long payload is stored hex-encoded next to
//! its SHA-256 so a hand-edited or truncated file is caught on read.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cardgate_core::{CardSummary, MAX_LONG_VALUE_BYTES};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::CardError;
use crate::reader::CardReader;

/// Reader status recorded in the mock card file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockCardStatus {
    NoCard,
    Ready,
    Error,
}

/// On-disk representation of the mock reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockCardFile {
    pub status: MockCardStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_value: Option<String>,
    /// Hex-encoded long payload
    #[serde(default)]
    pub long_value: String,
    /// Hex-encoded SHA-256 of the decoded long payload
    #[serde(default)]
    pub long_value_sha256: String,
    #[serde(default)]
    pub write_protected: bool,
}

impl MockCardFile {
    pub fn no_card() -> Self {
        Self {
            status: MockCardStatus::NoCard,
            short_value: None,
            long_value: String::new(),
            long_value_sha256: String::new(),
            write_protected: false,
        }
    }

    pub fn error() -> Self {
        Self {
            status: MockCardStatus::Error,
            ..Self::no_card()
        }
    }

    pub fn ready(short_value: Option<String>, long_value: &[u8], write_protected: bool) -> Self {
        let mut file = Self {
            status: MockCardStatus::Ready,
            short_value,
            write_protected,
            ..Self::no_card()
        };
        file.set_long_value(long_value);
        file
    }

    fn set_long_value(&mut self, value: &[u8]) {
        if value.is_empty() {
            self.long_value.clear();
            self.long_value_sha256.clear();
        } else {
            self.long_value = hex::encode(value);
            self.long_value_sha256 = hex::encode(Sha256::digest(value));
        }
    }

    /// Decode the long payload, checking it against the recorded hash
    pub fn decoded_long_value(&self) -> Result<Vec<u8>, CardError> {
        if self.long_value.is_empty() {
            return Ok(Vec::new());
        }
        let bytes = hex::decode(&self.long_value)
            .map_err(|e| CardError::Integrity(format!("long value is not hex: {}", e)))?;
        let digest = hex::encode(Sha256::digest(&bytes));
        if !digest.eq_ignore_ascii_case(&self.long_value_sha256) {
            return Err(CardError::Integrity(format!(
                "long value hash mismatch: expected {}, computed {}",
                self.long_value_sha256, digest
            )));
        }
        Ok(bytes)
    }

    pub fn summary(&self) -> CardSummary {
        match self.status {
            MockCardStatus::NoCard => CardSummary::NoCard,
            MockCardStatus::Error => CardSummary::Error,
            MockCardStatus::Ready => CardSummary::ready(
                self.short_value.clone().filter(|value| !value.is_empty()),
                !self.long_value.is_empty(),
            ),
        }
    }
}

/// Card reader backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileCard {
    path: PathBuf,
}

impl FileCard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file; `Ok(None)` if it does not exist
    pub async fn contents(&self) -> Result<Option<MockCardFile>, CardError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, file: &MockCardFile) -> Result<(), CardError> {
        let content = serde_json::to_string_pretty(file)?;
        tokio::fs::write(&self.path, content).await?;
        debug!("Wrote mock card file {:?}", self.path);
        Ok(())
    }

    /// Seat a programmed card
    pub async fn insert(
        &self,
        short_value: Option<String>,
        long_value: &[u8],
        write_protected: bool,
    ) -> Result<(), CardError> {
        check_capacity(long_value)?;
        self.store(&MockCardFile::ready(short_value, long_value, write_protected))
            .await
    }

    /// Seat a blank card
    pub async fn blank(&self) -> Result<(), CardError> {
        self.insert(None, &[], false).await
    }

    pub async fn remove(&self) -> Result<(), CardError> {
        self.store(&MockCardFile::no_card()).await
    }

    /// Put the reader into its error state
    pub async fn fault(&self) -> Result<(), CardError> {
        self.store(&MockCardFile::error()).await
    }

    /// Load the seated card for a write
    async fn seated(&self) -> Result<MockCardFile, CardError> {
        let file = self.contents().await?.unwrap_or_else(MockCardFile::no_card);
        match file.status {
            MockCardStatus::Ready => Ok(file),
            MockCardStatus::NoCard => Err(CardError::NoCard),
            MockCardStatus::Error => Err(CardError::ReaderFault("reader in error state".into())),
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

#[async_trait]
impl CardReader for FileCard {
    async fn read_summary(&self) -> Result<CardSummary, CardError> {
        match self.contents().await {
            Ok(Some(file)) => Ok(file.summary()),
            Ok(None) => Ok(CardSummary::NoCard),
            Err(CardError::Serialization(e)) => {
                warn!("Unreadable mock card file {:?}: {}", self.path, e);
                Ok(CardSummary::Error)
            }
            Err(e) => Err(e),
        }
    }

    async fn read_long_value(&self) -> Result<Vec<u8>, CardError> {
        self.seated().await?.decoded_long_value()
    }

    async fn override_write_protection(&self) -> Result<(), CardError> {
        let mut file = self.seated().await?;
        file.write_protected = false;
        self.store(&file).await
    }

    async fn write_short_value(&self, value: &str) -> Result<(), CardError> {
        let mut file = self.seated().await?;
        if file.write_protected {
            return Err(CardError::WriteProtected);
        }
        file.short_value = Some(value.to_string()).filter(|v| !v.is_empty());
        self.store(&file).await
    }

    async fn write_short_and_long_values(
        &self,
        short_value: &str,
        long_value: &[u8],
    ) -> Result<(), CardError> {
        check_capacity(long_value)?;
        let mut file = self.seated().await?;
        if file.write_protected {
            return Err(CardError::WriteProtected);
        }
        file.short_value = Some(short_value.to_string()).filter(|v| !v.is_empty());
        file.set_long_value(long_value);
        self.store(&file).await
    }

    async fn write_long_value(&self, value: &[u8]) -> Result<(), CardError> {
        check_capacity(value)?;
        let mut file = self.seated().await?;
        file.set_long_value(value);
        self.store(&file).await
    }
}
