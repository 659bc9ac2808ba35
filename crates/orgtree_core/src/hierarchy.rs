//! Subordinate resolution
//!
//! A vacant position does not end a branch of the hierarchy: the people who
//! report to it still belong to whoever sits above the vacancy. With the
//! vacancy fallback enabled, the resolver walks through vacant positions
//! depth-first and collects the first occupied positions it meets. Occupied
//! positions are never expanded further.

use std::collections::HashSet;
use std::sync::Arc;

use crate::entities::Position;
use crate::error::{DirectoryError, Result};
use crate::gateway::DirectoryGateway;
use crate::id::{PersonnelId, PositionId};

/// Walks the reporting structure through the gateway
#[derive(Clone)]
pub struct HierarchyResolver {
    gateway: Arc<dyn DirectoryGateway>,
}

impl HierarchyResolver {
    pub fn new(gateway: Arc<dyn DirectoryGateway>) -> Self {
        Self { gateway }
    }

    /// Positions reporting directly to `position_id`, vacant ones included.
    /// Closed positions are left out.
    pub async fn direct_subordinates(&self, position_id: &PositionId) -> Result<Vec<Position>> {
        self.gateway
            .direct_subordinates(position_id, false)
            .await
            .map_err(|cause| {
                DirectoryError::logged_unavailable(
                    "direct_subordinates",
                    position_id.to_string(),
                    cause,
                )
            })
    }

    /// Subordinate positions of `root`.
    ///
    /// Without the fallback this is the raw direct subordinate list. With it,
    /// vacant positions are replaced by their own occupied subordinates,
    /// recursively. Each call returns a fresh list.
    pub async fn resolve_occupied_subordinates(
        &self,
        root: &PositionId,
        include_vacancy_fallback: bool,
    ) -> Result<Vec<Position>> {
        let direct = self.direct_subordinates(root).await?;
        if !include_vacancy_fallback {
            return Ok(direct);
        }

        self.expand_vacancies(root, direct).await
    }

    /// Vacancy expansion over an already fetched direct subordinate list of
    /// `root`
    pub async fn expand_vacancies(
        &self,
        root: &PositionId,
        direct: Vec<Position>,
    ) -> Result<Vec<Position>> {
        let mut visited: HashSet<PositionId> = HashSet::from([root.clone()]);
        let mut occupied = Vec::new();

        // One iterator per open level keeps discovery order depth-first
        let mut levels = vec![direct.into_iter()];
        while let Some(level) = levels.last_mut() {
            let Some(position) = level.next() else {
                levels.pop();
                continue;
            };

            if !visited.insert(position.id.clone()) {
                tracing::debug!(position_id = %position.id, "position already visited, skipping");
                continue;
            }

            if position.is_occupied() {
                occupied.push(position);
                continue;
            }

            tracing::debug!(
                position_id = %position.id,
                depth = levels.len(),
                "vacant position, descending to its subordinates"
            );

            // The service may echo the queried position back in its own list
            let nested: Vec<Position> = self
                .direct_subordinates(&position.id)
                .await?
                .into_iter()
                .filter(|nested| nested.id != position.id)
                .collect();
            levels.push(nested.into_iter());
        }

        tracing::debug!(
            root = %root,
            occupied = occupied.len(),
            "resolved occupied subordinates"
        );
        Ok(occupied)
    }
}

/// Whether `personnel_id` actively holds one of `positions`
pub fn holds_any(positions: &[Position], personnel_id: &PersonnelId) -> bool {
    positions.iter().any(|position| {
        position
            .active_incumbents(false)
            .any(|incumbent| &incumbent.id == personnel_id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, InMemoryDirectory};
    use crate::test_helpers::fixtures::vacancy_tree;
    use crate::test_helpers::{MockGateway, person, position};
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn ids(positions: &[Position]) -> Vec<&str> {
        positions.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_vacancy_replaced_by_its_occupied_subordinates() {
        let directory = Arc::new(vacancy_tree());
        let resolver = HierarchyResolver::new(directory.clone());

        let resolved = resolver
            .resolve_occupied_subordinates(&PositionId::new("A"), true)
            .await
            .unwrap();

        assert_eq!(ids(&resolved), vec!["C", "D"]);
        // C is occupied, so its own subordinates are never requested
        assert_eq!(
            directory.requests(),
            vec!["direct_subordinates A", "direct_subordinates B"]
        );
    }

    #[tokio::test]
    async fn test_without_fallback_returns_raw_list() {
        let resolver = HierarchyResolver::new(Arc::new(vacancy_tree()));
        let resolved = resolver
            .resolve_occupied_subordinates(&PositionId::new("A"), false)
            .await
            .unwrap();

        assert_eq!(ids(&resolved), vec!["C", "B"]);
        assert!(!resolved[1].is_occupied());
    }

    #[tokio::test]
    async fn test_repeated_calls_return_equal_fresh_lists() {
        let resolver = HierarchyResolver::new(Arc::new(vacancy_tree()));
        let root = PositionId::new("A");

        let mut first = resolver.resolve_occupied_subordinates(&root, true).await.unwrap();
        let second = resolver.resolve_occupied_subordinates(&root, true).await.unwrap();
        assert_eq!(first, second);

        first.clear();
        let third = resolver.resolve_occupied_subordinates(&root, true).await.unwrap();
        assert_eq!(ids(&third), vec!["C", "D"]);
    }

    #[tokio::test]
    async fn test_discovery_order_is_depth_first() {
        let directory = InMemoryDirectory::new()
            .with_position(position("root", "d1", vec![person("boss", Some(100.0))]), None)
            .with_position(position("vacant", "d1", vec![]), Some("root"))
            .with_position(position("occupied", "d1", vec![person("u1", None)]), Some("root"))
            .with_position(position("nested", "d1", vec![person("u2", Some(25.0))]), Some("vacant"));
        let resolver = HierarchyResolver::new(Arc::new(directory));

        let resolved = resolver
            .resolve_occupied_subordinates(&PositionId::new("root"), true)
            .await
            .unwrap();
        assert_eq!(ids(&resolved), vec!["nested", "occupied"]);
    }

    #[tokio::test]
    async fn test_self_echo_and_cycles_terminate() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_direct_subordinates()
            .withf(|id, _| id.as_str() == "root")
            .returning(|_, _| Ok(vec![position("v1", "d1", vec![])]));
        // v1 lists itself and a vacancy that points back at v1
        gateway
            .expect_direct_subordinates()
            .withf(|id, _| id.as_str() == "v1")
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    position("v1", "d1", vec![]),
                    position("v2", "d1", vec![]),
                    position("p1", "d1", vec![person("u1", Some(100.0))]),
                ])
            });
        gateway
            .expect_direct_subordinates()
            .withf(|id, _| id.as_str() == "v2")
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    position("v1", "d1", vec![]),
                    position("p1", "d1", vec![person("u1", Some(100.0))]),
                ])
            });

        let resolver = HierarchyResolver::new(Arc::new(gateway));
        let resolved = resolver
            .resolve_occupied_subordinates(&PositionId::new("root"), true)
            .await
            .unwrap();

        assert_eq!(ids(&resolved), vec!["p1"]);
    }

    #[tokio::test]
    async fn test_acting_and_empty_incumbents_count_as_vacant() {
        let directory = InMemoryDirectory::new()
            .with_position(position("root", "d1", vec![]), None)
            .with_position(
                position(
                    "interim",
                    "d1",
                    vec![person("acting", Some(100.0)).with_employment(Some(100.0), true)],
                ),
                Some("root"),
            )
            .with_position(position("leaf", "d1", vec![person("u9", Some(10.0))]), Some("interim"));
        let resolver = HierarchyResolver::new(Arc::new(directory));

        let resolved = resolver
            .resolve_occupied_subordinates(&PositionId::new("root"), true)
            .await
            .unwrap();
        assert_eq!(ids(&resolved), vec!["leaf"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_gateway_failure_is_logged_and_wrapped() {
        let mut gateway = MockGateway::new();
        gateway.expect_direct_subordinates().returning(|_, _| {
            Err(GatewayError::Status {
                endpoint: "/internal/positions/X/direct-subordinates".to_string(),
                status: 500,
            })
        });

        let resolver = HierarchyResolver::new(Arc::new(gateway));
        let error = resolver
            .resolve_occupied_subordinates(&PositionId::new("X"), true)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            DirectoryError::DirectoryUnavailable { ref operation, ref ids, .. }
                if operation == "direct_subordinates" && ids == "X"
        ));
        assert!(logs_contain("directory lookup failed"));
    }

    #[test]
    fn test_holds_any_ignores_inactive_incumbents() {
        let positions = vec![position(
            "p1",
            "d1",
            vec![person("former", Some(0.0)), person("current", Some(100.0))],
        )];

        assert!(holds_any(&positions, &PersonnelId::new("current")));
        assert!(!holds_any(&positions, &PersonnelId::new("former")));
    }
}
