//! Chunked id lookups
//!
//! The directory service caps how many ids a single lookup may carry. The
//! fetcher splits longer lists into consecutive chunks, issues one call per
//! chunk and concatenates the answers in chunk order. The first failing chunk
//! fails the whole lookup.

use std::future::Future;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};

use crate::config::BatchConfig;
use crate::entities::{Department, PersonnelNumber, Position, PositionAttributes};
use crate::error::{DirectoryError, Result};
use crate::gateway::{DirectoryGateway, GatewayResult};
use crate::id::{DepartmentId, Id, IdType, PersonnelId, PositionId, join_ids};

/// Splits id lookups into service-sized requests
#[derive(Clone)]
pub struct BatchFetcher {
    gateway: Arc<dyn DirectoryGateway>,
    config: BatchConfig,
}

impl BatchFetcher {
    pub fn new(gateway: Arc<dyn DirectoryGateway>, config: BatchConfig) -> Self {
        Self { gateway, config }
    }

    pub fn gateway(&self) -> &Arc<dyn DirectoryGateway> {
        &self.gateway
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub async fn fetch_positions(&self, ids: &[PositionId]) -> Result<Vec<Position>> {
        self.fetch_chunked(
            "fetch_positions",
            ids,
            self.config.position_chunk_size,
            |chunk| self.gateway.positions_by_ids(chunk),
        )
        .await
    }

    pub async fn fetch_personnel(&self, ids: &[PersonnelId]) -> Result<Vec<PersonnelNumber>> {
        self.fetch_chunked(
            "fetch_personnel",
            ids,
            self.config.personnel_chunk_size,
            |chunk| self.gateway.personnel_by_ids(chunk),
        )
        .await
    }

    pub async fn fetch_departments(&self, ids: &[DepartmentId]) -> Result<Vec<Department>> {
        self.fetch_chunked(
            "fetch_departments",
            ids,
            self.config.department_chunk_size,
            |chunk| self.gateway.departments_by_ids(chunk),
        )
        .await
    }

    /// Positions in any of `department_ids`, chunked like department lookups
    pub async fn fetch_department_positions(
        &self,
        department_ids: &[DepartmentId],
    ) -> Result<Vec<Position>> {
        self.fetch_chunked(
            "fetch_department_positions",
            department_ids,
            self.config.department_chunk_size,
            |chunk| self.gateway.positions_in_departments(chunk),
        )
        .await
    }

    pub async fn fetch_departments_with_company(
        &self,
        ids: &[DepartmentId],
    ) -> Result<Vec<Department>> {
        self.fetch_chunked(
            "fetch_departments_with_company",
            ids,
            self.config.department_chunk_size,
            |chunk| self.gateway.departments_with_company(chunk),
        )
        .await
    }

    pub async fn fetch_position_attributes(
        &self,
        ids: &[PositionId],
    ) -> Result<Vec<PositionAttributes>> {
        self.fetch_chunked(
            "fetch_position_attributes",
            ids,
            self.config.position_chunk_size,
            |chunk| self.gateway.position_attributes(chunk),
        )
        .await
    }

    async fn fetch_chunked<'a, K, T, F, Fut>(
        &self,
        operation: &'static str,
        ids: &'a [Id<K>],
        chunk_size: usize,
        call: F,
    ) -> Result<Vec<T>>
    where
        K: IdType,
        F: Fn(&'a [Id<K>]) -> Fut,
        Fut: Future<Output = GatewayResult<Vec<T>>> + 'a,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = chunk_size.max(1);
        tracing::debug!(
            operation,
            ids = ids.len(),
            chunks = ids.len().div_ceil(chunk_size),
            "batched directory lookup"
        );

        let requests = ids.chunks(chunk_size).map(|chunk| {
            let request = call(chunk);
            async move { request.await.map_err(|cause| (chunk, cause)) }
        });

        // `buffered` yields in submission order even when chunks overlap
        let chunks: Vec<Vec<T>> = stream::iter(requests)
            .buffered(self.config.max_concurrent_chunks.max(1))
            .try_collect()
            .await
            .map_err(|(chunk, cause)| {
                DirectoryError::logged_unavailable(operation, join_ids(chunk), cause)
            })?;

        Ok(chunks.into_iter().flatten().collect())
    }
}
