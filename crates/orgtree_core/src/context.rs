//! Per-operation state
//!
//! An `OperationContext` is created for one logical request and dropped with
//! it. It carries the authenticated caller, the personnel records seen so far
//! and the caller's subordinate lists, which are resolved at most once per
//! context.

use tokio::sync::OnceCell;

use crate::cache::RequestScopedCache;
use crate::entities::{PersonnelNumber, Position};
use crate::error::{DirectoryError, Result};
use crate::hierarchy::HierarchyResolver;

#[derive(Debug, Default)]
pub struct OperationContext {
    auth_user: Option<PersonnelNumber>,
    cache: RequestScopedCache,
    direct_subordinates: OnceCell<Vec<Position>>,
    occupied_subordinates: OnceCell<Vec<Position>>,
}

impl OperationContext {
    /// Context acting on behalf of `auth_user`, who is recorded in the cache
    pub fn new(auth_user: PersonnelNumber) -> Self {
        let cache = RequestScopedCache::new();
        cache.record(&auth_user);

        Self {
            auth_user: Some(auth_user),
            cache,
            ..Self::default()
        }
    }

    /// Context without a caller. Caller-relative operations fail with
    /// `Unauthenticated`.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn auth_user(&self) -> Option<&PersonnelNumber> {
        self.auth_user.as_ref()
    }

    pub fn require_auth_user(&self, operation: &str) -> Result<&PersonnelNumber> {
        self.auth_user
            .as_ref()
            .ok_or_else(|| DirectoryError::unauthenticated(operation))
    }

    pub fn cache(&self) -> &RequestScopedCache {
        &self.cache
    }

    /// The caller's current position
    pub fn auth_position(&self, operation: &str) -> Result<&Position> {
        let user = self.require_auth_user(operation)?;
        user.current_position(false)
            .ok_or_else(|| DirectoryError::NoCurrentPosition {
                user_id: user.id.clone(),
            })
    }

    /// Subordinates of the caller's current position, memoized per context
    /// and per fallback mode
    pub async fn subordinates(
        &self,
        resolver: &HierarchyResolver,
        include_vacancy_fallback: bool,
    ) -> Result<&[Position]> {
        let root = self.auth_position("subordinates")?;

        let direct = self
            .direct_subordinates
            .get_or_try_init(|| async {
                let positions = resolver.direct_subordinates(&root.id).await?;
                self.cache.record_incumbents(&positions);
                Ok::<_, DirectoryError>(positions)
            })
            .await?;

        if !include_vacancy_fallback {
            return Ok(direct.as_slice());
        }

        let occupied = self
            .occupied_subordinates
            .get_or_try_init(|| async {
                let positions = resolver.expand_vacancies(&root.id, direct.clone()).await?;
                self.cache.record_incumbents(&positions);
                Ok::<_, DirectoryError>(positions)
            })
            .await?;

        Ok(occupied.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::PersonnelId;
    use crate::test_helpers::fixtures::vacancy_tree;
    use crate::test_helpers::{held_position, person};
    use std::sync::Arc;

    fn caller() -> PersonnelNumber {
        person("u-root", None).with_positions(vec![held_position("A", "d-root", Some(100.0))])
    }

    #[tokio::test]
    async fn test_subordinates_resolved_once_per_context() {
        let directory = Arc::new(vacancy_tree());
        let resolver = HierarchyResolver::new(directory.clone());
        let context = OperationContext::new(caller());

        let direct = context.subordinates(&resolver, false).await.unwrap().len();
        let occupied = context.subordinates(&resolver, true).await.unwrap().len();
        let again = context.subordinates(&resolver, true).await.unwrap().len();

        assert_eq!((direct, occupied, again), (2, 2, 2));
        assert_eq!(directory.request_count("direct_subordinates A"), 1);
        assert_eq!(directory.request_count("direct_subordinates B"), 1);
    }

    #[tokio::test]
    async fn test_anonymous_context_is_rejected() {
        let resolver = HierarchyResolver::new(Arc::new(vacancy_tree()));
        let error = OperationContext::anonymous()
            .subordinates(&resolver, true)
            .await
            .unwrap_err();
        assert!(matches!(error, DirectoryError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_caller_without_current_position() {
        let resolver = HierarchyResolver::new(Arc::new(vacancy_tree()));
        let context = OperationContext::new(person("u-idle", None));

        let error = context.subordinates(&resolver, false).await.unwrap_err();
        assert!(matches!(error, DirectoryError::NoCurrentPosition { .. }));
    }

    #[test]
    fn test_auth_user_is_cached() {
        let context = OperationContext::new(caller());
        assert!(context.cache().contains(&PersonnelId::new("u-root")));
    }
}
