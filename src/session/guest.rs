use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::Identity;

/// Locally kept proof of a guest session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuestRecord {
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
}

impl GuestRecord {
    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.created_at + ttl
    }

    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now >= self.expires_at(ttl)
    }
}

/// Where the guest record survives between runs
#[async_trait]
pub trait GuestStorage: Send + Sync {
    async fn load(&self) -> Result<Option<GuestRecord>>;

    async fn save(&self, record: &GuestRecord) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Guest record stored as a JSON file
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl GuestStorage for JsonFileStorage {
    async fn load(&self) -> Result<Option<GuestRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Storage(format!("{}: {e}", self.path.display()))),
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Ignoring unreadable guest record {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    async fn save(&self, record: &GuestRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| AppError::Storage(format!("{}: {e}", self.path.display())))?;
        debug!("Saved guest record to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("{}: {e}", self.path.display()))),
        }
    }
}

/// Process-local storage, forgotten on exit
#[derive(Default)]
pub struct MemoryStorage {
    record: Mutex<Option<GuestRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: GuestRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    pub fn snapshot(&self) -> Option<GuestRecord> {
        self.record.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl GuestStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<GuestRecord>> {
        Ok(self.snapshot())
    }

    async fn save(&self, record: &GuestRecord) -> Result<()> {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = Some(record.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
