//! Orgtree Core - Organizational Directory Hierarchy Engine
//!
//! This crate resolves reporting hierarchies held by a remote directory
//! service: who reports to whom once vacant positions are looked through,
//! who belongs to a manager's team, and which departments a user may
//! manage. All network access goes through the `DirectoryGateway` trait.

pub mod batch;
pub mod cache;
pub mod classify;
pub mod closure;
pub mod config;
pub mod context;
pub mod directory;
pub mod entities;
pub mod error;
pub mod gateway;
pub mod hierarchy;
pub mod id;
pub mod permission;
pub mod team;

#[cfg(test)]
mod test_helpers;

pub use batch::BatchFetcher;
pub use cache::RequestScopedCache;
pub use classify::{DepartmentClassifier, KeywordClassifier};
pub use closure::{DepartmentClosure, GatewayClosure, InMemoryClosure};
pub use config::OrgtreeConfig;
pub use context::OperationContext;
pub use directory::{DepartmentFields, Directory, UserProfile};
pub use entities::{
    Company, Department, Employment, PersonnelNumber, Position, PositionAttributes, PositionPivot,
};
pub use error::{DirectoryError, Result};
pub use gateway::{
    DirectoryGateway, DirectorySnapshot, GatewayError, HttpDirectoryGateway, InMemoryDirectory,
};
pub use hierarchy::HierarchyResolver;
pub use id::{DepartmentId, Id, IdType, PersonnelId, PositionId};
pub use permission::PermissionEvaluator;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        Department, DepartmentClosure, DepartmentId, Directory, DirectoryError, DirectoryGateway,
        OperationContext, OrgtreeConfig, PersonnelId, PersonnelNumber, Position, PositionId,
        Result, UserProfile,
    };
}
