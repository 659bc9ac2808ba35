//! Access to the remote directory service
//!
//! `DirectoryGateway` is the only seam through which the engine reaches the
//! network. Implementations return typed entities or a `GatewayError`; the
//! engine decides how a failure is logged and surfaced.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::entities::{Department, PersonnelNumber, Position, PositionAttributes};
use crate::id::{DepartmentId, PersonnelId, PositionId};

pub mod http;
pub mod memory;

pub use http::HttpDirectoryGateway;
pub use memory::{DirectorySnapshot, InMemoryDirectory};

/// Gateway failure type
#[derive(Error, Debug, Diagnostic)]
pub enum GatewayError {
    #[error("Request to {endpoint} failed")]
    #[diagnostic(help("Check that the directory service is reachable"))]
    Transport {
        endpoint: String,
        #[source]
        cause: reqwest::Error,
    },

    #[error("Unauthorized request to {endpoint}")]
    #[diagnostic(help("Check the internal API login and password"))]
    Unauthorized { endpoint: String },

    #[error("{endpoint} responded with status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Could not decode response from {endpoint}")]
    #[diagnostic(help("The directory service schema may have changed"))]
    Decode {
        endpoint: String,
        #[source]
        cause: serde_json::Error,
    },

    #[error("Invalid snapshot: {0}")]
    Snapshot(String),
}

impl GatewayError {
    /// The documented "does not exist" signal, as opposed to a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Calls exposed by the directory service
///
/// Batch lookups (`*_by_ids`) must be called with at most the service's
/// per-request limit; `BatchFetcher` takes care of chunking.
#[async_trait]
pub trait DirectoryGateway: Send + Sync {
    /// Positions that report directly to `position_id`
    async fn direct_subordinates(
        &self,
        position_id: &PositionId,
        include_inactive_positions: bool,
    ) -> GatewayResult<Vec<Position>>;

    async fn position(&self, position_id: &PositionId) -> GatewayResult<Position>;

    /// At most 500 ids per call
    async fn positions_by_ids(&self, ids: &[PositionId]) -> GatewayResult<Vec<Position>>;

    /// At most 1000 ids per call
    async fn personnel_by_ids(&self, ids: &[PersonnelId]) -> GatewayResult<Vec<PersonnelNumber>>;

    /// At most 500 ids per call
    async fn departments_by_ids(&self, ids: &[DepartmentId]) -> GatewayResult<Vec<Department>>;

    /// Fails with `GatewayError::NotFound` when the department does not exist
    async fn department(&self, department_id: &DepartmentId) -> GatewayResult<Department>;

    /// Direct child departments
    async fn department_children(
        &self,
        department_id: &DepartmentId,
    ) -> GatewayResult<Vec<Department>>;

    /// Root of the department tree, with its children when `flatten` is set
    async fn top_departments(&self, flatten: bool) -> GatewayResult<Vec<Department>>;

    /// Positions searched by department. At most 500 ids per call.
    async fn positions_in_departments(
        &self,
        department_ids: &[DepartmentId],
    ) -> GatewayResult<Vec<Position>>;

    /// Departments with their owning company attached. At most 500 ids per
    /// call.
    async fn departments_with_company(
        &self,
        ids: &[DepartmentId],
    ) -> GatewayResult<Vec<Department>>;

    /// At most 500 ids per call
    async fn position_attributes(
        &self,
        ids: &[PositionId],
    ) -> GatewayResult<Vec<PositionAttributes>>;
}
