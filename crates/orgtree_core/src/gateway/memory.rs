//! In-memory directory, loaded from a JSON snapshot
//!
//! Serves the same calls as the HTTP gateway from a fixed data set. Used for
//! offline inspection from the CLI and as the fixture backend in tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::Local;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{DirectoryGateway, GatewayError, GatewayResult};
use crate::entities::{Department, PersonnelNumber, Position, PositionAttributes};
use crate::id::{DepartmentId, PersonnelId, PositionId};

/// A position plus the position it reports to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPosition {
    #[serde(flatten)]
    pub position: Position,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_to: Option<PositionId>,
}

/// Serialized form of a directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub departments: Vec<Department>,

    #[serde(default)]
    pub positions: Vec<SnapshotPosition>,

    /// Full personnel records. People who only appear as incumbents get a
    /// record derived from the positions they hold.
    #[serde(default)]
    pub personnel: Vec<PersonnelNumber>,

    #[serde(default)]
    pub position_attributes: Vec<PositionAttributes>,
}

impl DirectorySnapshot {
    pub fn from_json(json: &str) -> GatewayResult<Self> {
        serde_json::from_str(json).map_err(|e| GatewayError::Snapshot(e.to_string()))
    }
}

/// Directory served from memory
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    departments: Vec<Department>,
    positions: Vec<SnapshotPosition>,
    personnel: Vec<PersonnelNumber>,
    position_attributes: Vec<PositionAttributes>,
    requests: Mutex<Vec<String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
        Self {
            departments: snapshot.departments,
            positions: snapshot.positions,
            personnel: snapshot.personnel,
            position_attributes: snapshot.position_attributes,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Load a snapshot file
    pub async fn from_path(path: &Path) -> GatewayResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::Snapshot(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_snapshot(DirectorySnapshot::from_json(&content)?))
    }

    pub fn with_department(mut self, department: Department) -> Self {
        self.departments.push(department);
        self
    }

    pub fn with_position(mut self, position: Position, reports_to: Option<&str>) -> Self {
        self.positions.push(SnapshotPosition {
            position,
            reports_to: reports_to.map(PositionId::from),
        });
        self
    }

    pub fn with_personnel(mut self, person: PersonnelNumber) -> Self {
        self.personnel.push(person);
        self
    }

    pub fn with_position_attributes(mut self, attributes: PositionAttributes) -> Self {
        self.position_attributes.push(attributes);
        self
    }

    /// Calls served so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Number of calls served so far whose name starts with `call`
    pub fn request_count(&self, call: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.starts_with(call))
            .count()
    }

    fn record(&self, request: String) {
        self.requests.lock().push(request);
    }

    fn find_department(&self, id: &DepartmentId) -> Option<&Department> {
        self.departments.iter().find(|department| &department.id == id)
    }

    /// Positions are returned with their department inlined, as the
    /// service does
    fn hydrate(&self, position: &Position) -> Position {
        let mut position = position.clone();
        if position.department.is_none() {
            position.department = self
                .find_department(&position.department_id)
                .map(|department| Box::new(department.clone()));
        }
        position
    }

    fn is_closed(position: &Position) -> bool {
        let today = Local::now().date_naive();
        position.end_date.is_some_and(|end| end < today)
    }

    fn derive_personnel(&self, id: &PersonnelId) -> Option<PersonnelNumber> {
        let mut derived: Option<PersonnelNumber> = None;

        for entry in &self.positions {
            for incumbent in &entry.position.personnel_numbers {
                if &incumbent.id != id {
                    continue;
                }

                let mut held = self.hydrate(&entry.position).without_personnel();
                held.employment = incumbent.employment.clone();

                derived
                    .get_or_insert_with(|| incumbent.without_positions())
                    .positions
                    .push(held);
            }
        }

        derived
    }
}

#[async_trait]
impl DirectoryGateway for InMemoryDirectory {
    async fn direct_subordinates(
        &self,
        position_id: &PositionId,
        include_inactive_positions: bool,
    ) -> GatewayResult<Vec<Position>> {
        self.record(format!("direct_subordinates {}", position_id));

        Ok(self
            .positions
            .iter()
            .filter(|entry| entry.reports_to.as_ref() == Some(position_id))
            .filter(|entry| include_inactive_positions || !Self::is_closed(&entry.position))
            .map(|entry| self.hydrate(&entry.position))
            .collect())
    }

    async fn position(&self, position_id: &PositionId) -> GatewayResult<Position> {
        self.record(format!("position {}", position_id));

        self.positions
            .iter()
            .find(|entry| &entry.position.id == position_id)
            .map(|entry| self.hydrate(&entry.position))
            .ok_or_else(|| GatewayError::NotFound {
                kind: "position",
                id: position_id.to_string(),
            })
    }

    async fn positions_by_ids(&self, ids: &[PositionId]) -> GatewayResult<Vec<Position>> {
        self.record(format!("positions_by_ids {}", ids.len()));

        let by_id: HashMap<&PositionId, &Position> = self
            .positions
            .iter()
            .map(|entry| (&entry.position.id, &entry.position))
            .collect();

        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|position| self.hydrate(position))
            .collect())
    }

    async fn personnel_by_ids(&self, ids: &[PersonnelId]) -> GatewayResult<Vec<PersonnelNumber>> {
        self.record(format!("personnel_by_ids {}", ids.len()));

        Ok(ids
            .iter()
            .filter_map(|id| {
                self.personnel
                    .iter()
                    .find(|person| &person.id == id)
                    .cloned()
                    .or_else(|| self.derive_personnel(id))
            })
            .collect())
    }

    async fn departments_by_ids(&self, ids: &[DepartmentId]) -> GatewayResult<Vec<Department>> {
        self.record(format!("departments_by_ids {}", ids.len()));

        // Companies are only attached on request
        Ok(ids
            .iter()
            .filter_map(|id| self.find_department(id))
            .map(|department| Department {
                company: None,
                ..department.clone()
            })
            .collect())
    }

    async fn department(&self, department_id: &DepartmentId) -> GatewayResult<Department> {
        self.record(format!("department {}", department_id));

        self.find_department(department_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                kind: "department",
                id: department_id.to_string(),
            })
    }

    async fn department_children(
        &self,
        department_id: &DepartmentId,
    ) -> GatewayResult<Vec<Department>> {
        self.record(format!("department_children {}", department_id));

        Ok(self
            .departments
            .iter()
            .filter(|department| department.parent_id.as_ref() == Some(department_id))
            .cloned()
            .collect())
    }

    async fn top_departments(&self, flatten: bool) -> GatewayResult<Vec<Department>> {
        self.record(format!("top_departments {}", flatten));

        let mut children: BTreeMap<&DepartmentId, Vec<Department>> = BTreeMap::new();
        if flatten {
            for department in &self.departments {
                if let Some(parent_id) = &department.parent_id {
                    children
                        .entry(parent_id)
                        .or_default()
                        .push(department.clone());
                }
            }
        }

        Ok(self
            .departments
            .iter()
            .filter(|department| department.parent_id.is_none())
            .map(|department| {
                let mut top = department.clone();
                top.children = children.remove(&department.id).unwrap_or_default();
                top
            })
            .collect())
    }

    async fn positions_in_departments(
        &self,
        department_ids: &[DepartmentId],
    ) -> GatewayResult<Vec<Position>> {
        self.record(format!("positions_in_departments {}", department_ids.len()));

        let wanted: HashSet<&DepartmentId> = department_ids.iter().collect();
        Ok(self
            .positions
            .iter()
            .filter(|entry| wanted.contains(&entry.position.department_id))
            .filter(|entry| !Self::is_closed(&entry.position))
            .map(|entry| self.hydrate(&entry.position))
            .collect())
    }

    async fn departments_with_company(
        &self,
        ids: &[DepartmentId],
    ) -> GatewayResult<Vec<Department>> {
        self.record(format!("departments_with_company {}", ids.len()));

        Ok(ids
            .iter()
            .filter_map(|id| self.find_department(id).cloned())
            .collect())
    }

    async fn position_attributes(
        &self,
        ids: &[PositionId],
    ) -> GatewayResult<Vec<PositionAttributes>> {
        self.record(format!("position_attributes {}", ids.len()));

        Ok(ids
            .iter()
            .filter_map(|id| {
                self.position_attributes
                    .iter()
                    .find(|attributes| &attributes.position_id == id)
                    .cloned()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Company;

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::new()
            .with_department(Department::new("d1", "Head office").with_manager("boss"))
            .with_department(Department::new("d2", "Brigade 7").with_parent("d1"))
            .with_position(
                Position::new("boss", "Director", "d1").with_incumbents(vec![
                    PersonnelNumber::new("u1", "Director").with_employment(Some(100.0), false),
                ]),
                None,
            )
            .with_position(
                Position::new("lead", "Foreman", "d2").with_incumbents(vec![
                    PersonnelNumber::new("u2", "Foreman").with_employment(Some(50.0), false),
                ]),
                Some("boss"),
            )
    }

    #[tokio::test]
    async fn test_direct_subordinates_are_hydrated() {
        let directory = directory();
        let subordinates = directory
            .direct_subordinates(&PositionId::new("boss"), false)
            .await
            .unwrap();

        assert_eq!(subordinates.len(), 1);
        assert_eq!(subordinates[0].id.as_str(), "lead");
        assert_eq!(subordinates[0].department.as_ref().unwrap().name, "Brigade 7");
        assert_eq!(directory.request_count("direct_subordinates"), 1);
    }

    #[tokio::test]
    async fn test_personnel_derived_from_incumbency() {
        let directory = directory();
        let people = directory
            .personnel_by_ids(&[PersonnelId::new("u2"), PersonnelId::new("missing")])
            .await
            .unwrap();

        assert_eq!(people.len(), 1);
        let current = people[0].current_position(false).unwrap();
        assert_eq!(current.id.as_str(), "lead");
        assert_eq!(current.employment.employment_percent, Some(50.0));
        assert!(current.personnel_numbers.is_empty());
    }

    #[tokio::test]
    async fn test_missing_department_is_not_found() {
        let error = directory()
            .department(&DepartmentId::new("nope"))
            .await
            .unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_top_departments_flattened() {
        let top = directory().top_departments(true).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].children.len(), 1);
        assert_eq!(top[0].children[0].id.as_str(), "d2");
    }

    #[tokio::test]
    async fn test_positions_searched_by_department() {
        let directory =
            directory().with_position(Position::new("spare", "Fitter", "d2"), Some("lead"));
        let found = directory
            .positions_in_departments(&[DepartmentId::new("d2")])
            .await
            .unwrap();

        let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["lead", "spare"]);
        assert!(found[0].department.is_some());
    }

    #[tokio::test]
    async fn test_company_only_when_requested() {
        let directory = InMemoryDirectory::new().with_department(
            Department::new("d1", "Head office").with_company(Company {
                id: "c1".to_string(),
                name: "Holding".to_string(),
            }),
        );
        let ids = [DepartmentId::new("d1")];

        let plain = directory.departments_by_ids(&ids).await.unwrap();
        assert!(plain[0].company.is_none());

        let with_company = directory.departments_with_company(&ids).await.unwrap();
        assert_eq!(with_company[0].company.as_ref().unwrap().name, "Holding");
    }

    #[test]
    fn test_snapshot_reports_to() {
        let snapshot = DirectorySnapshot::from_json(
            r#"{
                "positions": [
                    {"id": "a", "department_id": "d1"},
                    {"id": "b", "department_id": "d1", "reports_to": "a"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(snapshot.positions[1].reports_to, Some(PositionId::new("a")));
        assert!(snapshot.positions[0].reports_to.is_none());
    }
}
