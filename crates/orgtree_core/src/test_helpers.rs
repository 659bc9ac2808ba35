#![cfg(test)]

use async_trait::async_trait;
use mockall::mock;

use crate::entities::{Department, PersonnelNumber, Position, PositionAttributes};
use crate::gateway::{DirectoryGateway, GatewayResult};
use crate::id::{DepartmentId, PersonnelId, PositionId};

mock! {
    pub Gateway {}

    #[async_trait]
    impl DirectoryGateway for Gateway {
        async fn direct_subordinates(
            &self,
            position_id: &PositionId,
            include_inactive_positions: bool,
        ) -> GatewayResult<Vec<Position>>;
        async fn position(&self, position_id: &PositionId) -> GatewayResult<Position>;
        async fn positions_by_ids(&self, ids: &[PositionId]) -> GatewayResult<Vec<Position>>;
        async fn personnel_by_ids(&self, ids: &[PersonnelId]) -> GatewayResult<Vec<PersonnelNumber>>;
        async fn departments_by_ids(&self, ids: &[DepartmentId]) -> GatewayResult<Vec<Department>>;
        async fn department(&self, department_id: &DepartmentId) -> GatewayResult<Department>;
        async fn department_children(
            &self,
            department_id: &DepartmentId,
        ) -> GatewayResult<Vec<Department>>;
        async fn top_departments(&self, flatten: bool) -> GatewayResult<Vec<Department>>;
        async fn positions_in_departments(
            &self,
            department_ids: &[DepartmentId],
        ) -> GatewayResult<Vec<Position>>;
        async fn departments_with_company(
            &self,
            ids: &[DepartmentId],
        ) -> GatewayResult<Vec<Department>>;
        async fn position_attributes(
            &self,
            ids: &[PositionId],
        ) -> GatewayResult<Vec<PositionAttributes>>;
    }
}

/// A person with the given employment percent
pub fn person(id: &str, employment_percent: Option<f64>) -> PersonnelNumber {
    PersonnelNumber::new(id, format!("Person {}", id)).with_employment(employment_percent, false)
}

/// A position in `department_id` held by `incumbents`
pub fn position(id: &str, department_id: &str, incumbents: Vec<PersonnelNumber>) -> Position {
    Position::new(id, format!("Position {}", id), department_id).with_incumbents(incumbents)
}

/// A position nested under its holder, carrying the assignment
pub fn held_position(id: &str, department_id: &str, employment_percent: Option<f64>) -> Position {
    let mut held = Position::new(id, format!("Position {}", id), department_id);
    held.employment.employment_percent = employment_percent;
    held
}

pub mod fixtures {
    use super::*;
    use crate::gateway::InMemoryDirectory;

    /// ```text
    /// A (u-root, dept d-root, manages d-root)
    /// ├── C (u1, manages d-site)
    /// │   └── E (u3)
    /// └── B (vacant)
    ///     └── D (u2)
    /// ```
    pub fn vacancy_tree() -> InMemoryDirectory {
        InMemoryDirectory::new()
            .with_department(Department::new("d-root", "Head office").with_manager("A"))
            .with_department(
                Department::new("d-site", "Участок 4")
                    .with_parent("d-root")
                    .with_manager("C"),
            )
            .with_position(
                position("A", "d-root", vec![person("u-root", Some(100.0))]),
                None,
            )
            .with_position(position("C", "d-site", vec![person("u1", Some(100.0))]), Some("A"))
            .with_position(
                position("B", "d-root", vec![person("u-gone", Some(0.0))]),
                Some("A"),
            )
            .with_position(position("D", "d-root", vec![person("u2", None)]), Some("B"))
            .with_position(position("E", "d-site", vec![person("u3", Some(50.0))]), Some("C"))
    }
}
