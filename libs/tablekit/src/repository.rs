//! Repository dispatch layer over a table storage backend.
//!
//! Consumes the mapping engine: every operation maps input entities to
//! rows, calls the storage collaborator, and maps result rows back.
//! Update and delete need the row's current concurrency token; a small
//! per-instance lookaside of previously seen tokens skips the pre-read
//! when possible. The lookaside is best-effort only: a not-found read
//! outcome always wins over a cached entry, and a stale token is evicted
//! on conflict.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use tablekit_store::{RowBag, StoreError, TableClient};

use crate::entity::EntityMapper;
use crate::error::RepoError;
use crate::mapper::RowKeys;
use crate::predicate::Expr;

/// Page size used when draining a full collection.
const LIST_PAGE_SIZE: usize = 256;

/// One page of mapped entities.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub continuation: Option<String>,
}

/// Typed repository for one domain type over one table.
pub struct TableRepository<E> {
    table: String,
    client: Arc<dyn TableClient>,
    mapper: EntityMapper<E>,
    etags: Mutex<HashMap<(String, String), String>>,
}

impl<E: Default + Send + Sync + 'static> TableRepository<E> {
    pub fn new(
        table: impl Into<String>,
        client: Arc<dyn TableClient>,
        mapper: EntityMapper<E>,
    ) -> Self {
        Self {
            table: table.into(),
            client,
            mapper,
            etags: Mutex::new(HashMap::new()),
        }
    }

    fn cache_etag(&self, keys: &RowKeys, row: &RowBag) {
        if let Some(etag) = row.etag.clone() {
            self.etags
                .lock()
                .insert((keys.partition_key.clone(), keys.row_key.clone()), etag);
        }
    }

    fn evict(&self, keys: &RowKeys) {
        self.etags
            .lock()
            .remove(&(keys.partition_key.clone(), keys.row_key.clone()));
    }

    /// Current concurrency token for the key pair: cached if seen, else
    /// a point read. A missing row is `EntityNotFound` and evicts any
    /// stale cache entry.
    async fn etag_for(
        &self,
        keys: &RowKeys,
        cancel: CancellationToken,
    ) -> Result<String, RepoError> {
        let cached = {
            let guard = self.etags.lock();
            guard
                .get(&(keys.partition_key.clone(), keys.row_key.clone()))
                .cloned()
        };
        if let Some(etag) = cached {
            return Ok(etag);
        }
        let found = self
            .client
            .get(&self.table, &keys.partition_key, &keys.row_key, cancel)
            .await?;
        match found {
            Some(row) => {
                let etag = row.etag.clone().ok_or_else(|| {
                    RepoError::Store(StoreError::Backend(
                        "row returned without a concurrency token".to_owned(),
                    ))
                })?;
                self.cache_etag(keys, &row);
                Ok(etag)
            }
            None => {
                self.evict(keys);
                Err(RepoError::EntityNotFound {
                    partition_key: keys.partition_key.clone(),
                    row_key: keys.row_key.clone(),
                })
            }
        }
    }

    /// Create the entity; fails if the key pair already exists.
    ///
    /// # Errors
    /// `RepoError::Mapping` on conversion failure, `RepoError::Store`
    /// (`AlreadyExists`) when the key pair is taken.
    #[instrument(skip(self, entity, cancel), fields(table = %self.table))]
    pub async fn create(&self, entity: &E, cancel: CancellationToken) -> Result<(), RepoError> {
        let row = self.mapper.to_row(entity)?;
        let keys = RowKeys {
            partition_key: row.partition_key.clone(),
            row_key: row.row_key.clone(),
        };
        let stored = self.client.insert(&self.table, row, cancel).await?;
        self.cache_etag(&keys, &stored);
        info!(partition_key = %keys.partition_key, row_key = %keys.row_key, "created entity");
        Ok(())
    }

    /// Point load. A missing key pair is `Ok(None)`, never an error.
    ///
    /// # Errors
    /// `RepoError::Mapping` or `RepoError::Store` on backend failure.
    #[instrument(skip(self, cancel), fields(table = %self.table))]
    pub async fn load(
        &self,
        partition_key: &str,
        row_key: &str,
        cancel: CancellationToken,
    ) -> Result<Option<E>, RepoError> {
        let keys = RowKeys {
            partition_key: partition_key.to_owned(),
            row_key: row_key.to_owned(),
        };
        match self
            .client
            .get(&self.table, partition_key, row_key, cancel)
            .await?
        {
            Some(row) => {
                self.cache_etag(&keys, &row);
                Ok(Some(self.mapper.from_row(&row)?))
            }
            None => {
                // never let a stale cache entry shadow a not-found read
                self.evict(&keys);
                Ok(None)
            }
        }
    }

    /// Point load that requires the entity to exist.
    ///
    /// # Errors
    /// `RepoError::EntityNotFound` when the key pair is absent.
    pub async fn get(
        &self,
        partition_key: &str,
        row_key: &str,
        cancel: CancellationToken,
    ) -> Result<E, RepoError> {
        self.load(partition_key, row_key, cancel)
            .await?
            .ok_or_else(|| RepoError::EntityNotFound {
                partition_key: partition_key.to_owned(),
                row_key: row_key.to_owned(),
            })
    }

    /// Replace the stored entity, guarded by its concurrency token.
    ///
    /// # Errors
    /// `RepoError::EntityNotFound` when the key pair is absent, never a
    /// silent no-op; `RepoError::Store` (`EtagMismatch`) on a concurrent
    /// modification.
    #[instrument(skip(self, entity, cancel), fields(table = %self.table))]
    pub async fn update(&self, entity: &E, cancel: CancellationToken) -> Result<(), RepoError> {
        let row = self.mapper.to_row(entity)?;
        let keys = RowKeys {
            partition_key: row.partition_key.clone(),
            row_key: row.row_key.clone(),
        };
        let etag = self.etag_for(&keys, cancel.clone()).await?;
        match self.client.update(&self.table, row, &etag, cancel).await {
            Ok(stored) => {
                self.cache_etag(&keys, &stored);
                debug!(partition_key = %keys.partition_key, row_key = %keys.row_key, "updated entity");
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => {
                self.evict(&keys);
                Err(RepoError::EntityNotFound {
                    partition_key: keys.partition_key,
                    row_key: keys.row_key,
                })
            }
            Err(err) => {
                if matches!(err, StoreError::EtagMismatch { .. }) {
                    self.evict(&keys);
                }
                Err(err.into())
            }
        }
    }

    /// Delete the stored entity, guarded by its concurrency token.
    ///
    /// # Errors
    /// Same contract as [`TableRepository::update`].
    pub async fn delete(&self, entity: &E, cancel: CancellationToken) -> Result<(), RepoError> {
        let keys = self.mapper.keys_of(entity);
        self.delete_by_key(&keys.partition_key, &keys.row_key, cancel)
            .await
    }

    /// Delete by key pair.
    ///
    /// # Errors
    /// `RepoError::EntityNotFound` when the key pair is absent.
    #[instrument(skip(self, cancel), fields(table = %self.table))]
    pub async fn delete_by_key(
        &self,
        partition_key: &str,
        row_key: &str,
        cancel: CancellationToken,
    ) -> Result<(), RepoError> {
        let keys = RowKeys {
            partition_key: partition_key.to_owned(),
            row_key: row_key.to_owned(),
        };
        let etag = self.etag_for(&keys, cancel.clone()).await?;
        let outcome = self
            .client
            .delete(&self.table, partition_key, row_key, &etag, cancel)
            .await;
        match outcome {
            Ok(()) => {
                self.evict(&keys);
                info!(partition_key, row_key, "deleted entity");
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => {
                self.evict(&keys);
                Err(RepoError::EntityNotFound {
                    partition_key: keys.partition_key,
                    row_key: keys.row_key,
                })
            }
            Err(err) => {
                if matches!(err, StoreError::EtagMismatch { .. }) {
                    self.evict(&keys);
                }
                Err(err.into())
            }
        }
    }

    /// First entity matching the predicate, in (partition key, row key)
    /// order.
    ///
    /// # Errors
    /// `RepoError::Query` when the predicate cannot be translated.
    #[instrument(skip(self, predicate, cancel), fields(table = %self.table))]
    pub async fn find_first(
        &self,
        predicate: &Expr,
        cancel: CancellationToken,
    ) -> Result<Option<E>, RepoError> {
        let filter = self.mapper.filter(predicate)?;
        let page = self
            .client
            .query(&self.table, Some(&filter), Some(1), None, cancel)
            .await?;
        match page.rows.into_iter().next() {
            Some(row) => Ok(Some(self.mapper.from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// All entities matching the predicate (`None` matches everything),
    /// draining pages internally.
    ///
    /// # Errors
    /// `RepoError::Query` when the predicate cannot be translated.
    #[instrument(skip(self, predicate, cancel), fields(table = %self.table))]
    pub async fn list(
        &self,
        predicate: Option<&Expr>,
        cancel: CancellationToken,
    ) -> Result<Vec<E>, RepoError> {
        let filter = match predicate {
            Some(expr) => Some(self.mapper.filter(expr)?),
            None => None,
        };
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let page = self
                .client
                .query(
                    &self.table,
                    filter.as_deref(),
                    Some(LIST_PAGE_SIZE),
                    continuation.as_deref(),
                    cancel.clone(),
                )
                .await?;
            for row in &page.rows {
                items.push(self.mapper.from_row(row)?);
            }
            match page.continuation {
                Some(next) => continuation = Some(next),
                None => break,
            }
        }
        debug!(count = items.len(), "listed entities");
        Ok(items)
    }

    /// One page of entities matching the predicate.
    ///
    /// # Errors
    /// `RepoError::Query` when the predicate cannot be translated,
    /// `RepoError::Store` (`InvalidContinuation`) for a bad paging token.
    #[instrument(skip(self, predicate, cancel), fields(table = %self.table))]
    pub async fn page(
        &self,
        predicate: Option<&Expr>,
        limit: Option<usize>,
        continuation: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Page<E>, RepoError> {
        let filter = match predicate {
            Some(expr) => Some(self.mapper.filter(expr)?),
            None => None,
        };
        let page = self
            .client
            .query(
                &self.table,
                filter.as_deref(),
                limit,
                continuation,
                cancel,
            )
            .await?;
        let mut items = Vec::with_capacity(page.rows.len());
        for row in &page.rows {
            items.push(self.mapper.from_row(row)?);
        }
        Ok(Page {
            items,
            continuation: page.continuation,
        })
    }
}
