//! Department ancestry
//!
//! Management checks need to know whether departments sit below other
//! departments. `DepartmentClosure` answers that; `InMemoryClosure` works from
//! a known set of parent links and `GatewayClosure` walks the tree through
//! the directory service.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;

use crate::entities::Department;
use crate::error::{DirectoryError, Result};
use crate::gateway::DirectoryGateway;
use crate::id::DepartmentId;

#[async_trait]
pub trait DepartmentClosure: Send + Sync {
    /// Every department below `department_id`, not including itself
    async fn child_department_ids(&self, department_id: &DepartmentId) -> Result<Vec<DepartmentId>>;

    /// True when each candidate is a strict descendant of at least one
    /// ancestor. An empty candidate list is trivially covered.
    async fn are_all_descendants_of(
        &self,
        candidates: &[DepartmentId],
        ancestors: &[DepartmentId],
    ) -> Result<bool> {
        if candidates.is_empty() {
            return Ok(true);
        }

        let mut covered = HashSet::new();
        for ancestor in ancestors {
            covered.extend(self.child_department_ids(ancestor).await?);
        }

        Ok(candidates.iter().all(|candidate| covered.contains(candidate)))
    }
}

/// Ancestry over a fixed set of departments
#[derive(Debug, Clone, Default)]
pub struct InMemoryClosure {
    children: HashMap<DepartmentId, Vec<DepartmentId>>,
}

impl InMemoryClosure {
    /// Builds from parent links, including nested `children` lists
    pub fn from_departments<'a>(departments: impl IntoIterator<Item = &'a Department>) -> Self {
        let mut closure = Self::default();
        for department in departments {
            closure.add(department);
        }
        closure
    }

    fn add(&mut self, department: &Department) {
        if let Some(parent_id) = &department.parent_id {
            self.link(parent_id, &department.id);
        }
        for child in &department.children {
            self.link(&department.id, &child.id);
            self.add(child);
        }
    }

    fn link(&mut self, parent_id: &DepartmentId, child_id: &DepartmentId) {
        let children = self.children.entry(parent_id.clone()).or_default();
        if !children.contains(child_id) {
            children.push(child_id.clone());
        }
    }

    fn descendants(&self, department_id: &DepartmentId) -> Vec<DepartmentId> {
        let mut seen: BTreeSet<&DepartmentId> = BTreeSet::new();
        let mut found = Vec::new();
        let mut queue: VecDeque<&DepartmentId> = VecDeque::from([department_id]);

        while let Some(current) = queue.pop_front() {
            for child in self.children.get(current).into_iter().flatten() {
                if child != department_id && seen.insert(child) {
                    found.push(child.clone());
                    queue.push_back(child);
                }
            }
        }

        found
    }
}

#[async_trait]
impl DepartmentClosure for InMemoryClosure {
    async fn child_department_ids(&self, department_id: &DepartmentId) -> Result<Vec<DepartmentId>> {
        Ok(self.descendants(department_id))
    }
}

/// Ancestry resolved level by level through `department_children`
#[derive(Clone)]
pub struct GatewayClosure {
    gateway: Arc<dyn DirectoryGateway>,
}

impl GatewayClosure {
    pub fn new(gateway: Arc<dyn DirectoryGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl DepartmentClosure for GatewayClosure {
    async fn child_department_ids(&self, department_id: &DepartmentId) -> Result<Vec<DepartmentId>> {
        let mut seen: HashSet<DepartmentId> = HashSet::from([department_id.clone()]);
        let mut found = Vec::new();
        let mut queue = VecDeque::from([department_id.clone()]);

        while let Some(current) = queue.pop_front() {
            let children = self
                .gateway
                .department_children(&current)
                .await
                .map_err(|cause| {
                    DirectoryError::logged_unavailable(
                        "department_children",
                        current.to_string(),
                        cause,
                    )
                })?;

            for child in children {
                if seen.insert(child.id.clone()) {
                    found.push(child.id.clone());
                    queue.push_back(child.id);
                }
            }
        }

        tracing::debug!(department_id = %department_id, descendants = found.len(), "walked department tree");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryDirectory;

    fn departments() -> Vec<Department> {
        vec![
            Department::new("plant", "Plant"),
            Department::new("shop", "Shop 1").with_parent("plant"),
            Department::new("crew", "Crew 7").with_parent("shop"),
            Department::new("office", "Office"),
        ]
    }

    fn ids(values: &[&str]) -> Vec<DepartmentId> {
        values.iter().map(|v| DepartmentId::new(*v)).collect()
    }

    #[tokio::test]
    async fn test_descendants_are_transitive() {
        let closure = InMemoryClosure::from_departments(&departments());
        let mut found = closure
            .child_department_ids(&DepartmentId::new("plant"))
            .await
            .unwrap();
        found.sort();

        assert_eq!(found, ids(&["crew", "shop"]));
        assert!(
            closure
                .child_department_ids(&DepartmentId::new("crew"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_all_candidates_must_be_covered() {
        let closure = InMemoryClosure::from_departments(&departments());
        let admin = ids(&["shop"]);

        assert!(closure.are_all_descendants_of(&ids(&["crew"]), &admin).await.unwrap());
        assert!(!closure.are_all_descendants_of(&ids(&["crew", "office"]), &admin).await.unwrap());
        // A department is not its own descendant
        assert!(!closure.are_all_descendants_of(&ids(&["shop"]), &admin).await.unwrap());
        assert!(closure.are_all_descendants_of(&[], &admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_nested_children_lists_are_linked() {
        let mut plant = Department::new("plant", "Plant");
        plant.children = vec![Department::new("shop", "Shop 1")];
        let closure = InMemoryClosure::from_departments([&plant]);

        assert_eq!(
            closure.child_department_ids(&DepartmentId::new("plant")).await.unwrap(),
            ids(&["shop"])
        );
    }

    #[tokio::test]
    async fn test_gateway_closure_walks_levels() {
        let mut directory = InMemoryDirectory::new();
        for department in departments() {
            directory = directory.with_department(department);
        }
        let directory = Arc::new(directory);
        let closure = GatewayClosure::new(directory.clone());

        let found = closure
            .child_department_ids(&DepartmentId::new("plant"))
            .await
            .unwrap();

        assert_eq!(found, ids(&["shop", "crew"]));
        assert_eq!(directory.request_count("department_children"), 3);
    }
}
