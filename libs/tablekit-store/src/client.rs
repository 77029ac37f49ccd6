use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::row::RowBag;

/// One page of a filtered enumeration, in (partition key, row key) order.
#[derive(Clone, Debug)]
pub struct RowPage {
    pub rows: Vec<RowBag>,
    /// Present when more matching rows remain past this page.
    pub continuation: Option<String>,
}

/// Opaque paging marker: the key pair of the last row already returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Continuation {
    pub partition_key: String,
    pub row_key: String,
}

impl Continuation {
    /// Encode to a base64url token.
    #[must_use]
    pub fn encode(&self) -> String {
        #[derive(serde::Serialize)]
        struct Wire<'a> {
            v: u8,
            pk: &'a str,
            rk: &'a str,
        }
        let w = Wire {
            v: 1,
            pk: &self.partition_key,
            rk: &self.row_key,
        };
        // serializing a flat struct of strings cannot fail
        let bytes = serde_json::to_vec(&w).unwrap_or_default();
        base64_url::encode(&bytes)
    }

    /// Decode from a base64url token.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidContinuation` if the token is not valid
    /// base64url, not valid JSON, or carries an unsupported version.
    pub fn decode(token: &str) -> Result<Self, StoreError> {
        #[derive(serde::Deserialize)]
        struct Wire {
            v: u8,
            pk: String,
            rk: String,
        }
        let bytes = base64_url::decode(token).map_err(|_| StoreError::InvalidContinuation)?;
        let w: Wire = serde_json::from_slice(&bytes).map_err(|_| StoreError::InvalidContinuation)?;
        if w.v != 1 {
            return Err(StoreError::InvalidContinuation);
        }
        Ok(Continuation {
            partition_key: w.pk,
            row_key: w.rk,
        })
    }
}

// base64url helpers (no padding)
mod base64_url {
    use base64::Engine;

    pub fn encode(bytes: &[u8]) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
    }
}

/// Async contract every table storage backend satisfies.
///
/// Rows are flat field bags addressed by a (partition key, row key) pair.
/// Writes that replace or remove an existing row require the row's current
/// concurrency token. Every operation accepts a cancellation token and
/// returns `StoreError::Cancelled` if it fires first.
#[async_trait]
pub trait TableClient: Send + Sync {
    /// Create a row if the key pair is absent.
    ///
    /// Returns the stored row with its fresh concurrency token.
    ///
    /// # Errors
    /// `StoreError::AlreadyExists` if the key pair is present.
    async fn insert(
        &self,
        table: &str,
        row: RowBag,
        cancel: CancellationToken,
    ) -> Result<RowBag, StoreError>;

    /// Point read. A missing row is `Ok(None)`, not an error.
    ///
    /// # Errors
    /// Backend failures only; absence is not an error.
    async fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        cancel: CancellationToken,
    ) -> Result<Option<RowBag>, StoreError>;

    /// Replace an existing row, guarded by its concurrency token.
    ///
    /// # Errors
    /// `StoreError::NotFound` if the key pair is absent,
    /// `StoreError::EtagMismatch` if `etag` is stale.
    async fn update(
        &self,
        table: &str,
        row: RowBag,
        etag: &str,
        cancel: CancellationToken,
    ) -> Result<RowBag, StoreError>;

    /// Delete an existing row, guarded by its concurrency token.
    ///
    /// # Errors
    /// `StoreError::NotFound` if the key pair is absent,
    /// `StoreError::EtagMismatch` if `etag` is stale.
    async fn delete(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        etag: &str,
        cancel: CancellationToken,
    ) -> Result<(), StoreError>;

    /// Filtered, paged enumeration in (partition key, row key) order.
    ///
    /// `filter` is the backend's native filter grammar; `None` matches
    /// everything. `limit` caps the page size; `None` means unbounded.
    ///
    /// # Errors
    /// `StoreError::InvalidFilter` for a malformed filter string,
    /// `StoreError::InvalidContinuation` for a bad paging token.
    async fn query(
        &self,
        table: &str,
        filter: Option<&str>,
        limit: Option<usize>,
        continuation: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<RowPage, StoreError>;
}
