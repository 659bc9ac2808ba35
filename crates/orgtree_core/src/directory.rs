//! The directory facade
//!
//! `Directory` wires the gateway, batching, hierarchy resolution,
//! classification and permission checks together. It holds no per-request
//! state: every caller-relative operation takes the `OperationContext` of the
//! request it serves.

use std::collections::{BTreeMap, HashSet};
use std::slice;
use std::sync::Arc;

use serde::Serialize;

use crate::batch::BatchFetcher;
use crate::classify::{DepartmentClassifier, KeywordClassifier};
use crate::closure::{DepartmentClosure, GatewayClosure};
use crate::config::OrgtreeConfig;
use crate::context::OperationContext;
use crate::entities::{Department, PersonnelNumber, Position, PositionAttributes};
use crate::error::{DirectoryError, Result};
use crate::gateway::{DirectoryGateway, HttpDirectoryGateway};
use crate::hierarchy::{HierarchyResolver, holds_any};
use crate::id::{DepartmentId, PersonnelId, PositionId};
use crate::permission::PermissionEvaluator;
use crate::team;

/// Selected department fields keyed by their dotted path, always with `id`
pub type DepartmentFields = BTreeMap<String, serde_json::Value>;

/// A resolved employee as handed to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: PersonnelId,
    pub department_id: Option<DepartmentId>,
    pub user: PersonnelNumber,
    pub position: Option<Position>,
}

#[derive(Clone)]
pub struct Directory {
    gateway: Arc<dyn DirectoryGateway>,
    fetcher: BatchFetcher,
    resolver: HierarchyResolver,
    permissions: PermissionEvaluator,
    closure: Arc<dyn DepartmentClosure>,
    classifier: Arc<dyn DepartmentClassifier>,
}

impl Directory {
    pub fn new(
        gateway: Arc<dyn DirectoryGateway>,
        closure: Arc<dyn DepartmentClosure>,
        config: &OrgtreeConfig,
    ) -> Self {
        let resolver = HierarchyResolver::new(gateway.clone());

        Self {
            fetcher: BatchFetcher::new(gateway.clone(), config.batching.clone()),
            permissions: PermissionEvaluator::new(closure.clone(), resolver.clone()),
            classifier: Arc::new(KeywordClassifier::from_config(&config.classification)),
            resolver,
            closure,
            gateway,
        }
    }

    /// Directory over the HTTP service, resolving ancestry through it too
    pub fn from_config(config: &OrgtreeConfig) -> Result<Self> {
        config.validate("<provided configuration>")?;

        let gateway: Arc<dyn DirectoryGateway> = Arc::new(
            HttpDirectoryGateway::new(&config.service)
                .map_err(|cause| {
                    DirectoryError::logged_unavailable("connect", &config.service.url, cause)
                })?,
        );
        let closure = Arc::new(GatewayClosure::new(gateway.clone()));

        Ok(Self::new(gateway, closure, config))
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn DepartmentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn resolver(&self) -> &HierarchyResolver {
        &self.resolver
    }

    pub fn fetcher(&self) -> &BatchFetcher {
        &self.fetcher
    }

    pub fn permissions(&self) -> &PermissionEvaluator {
        &self.permissions
    }

    // Hierarchy and teams

    /// The caller's team: everyone on the occupied positions below the
    /// caller's current position, looking through vacancies
    pub async fn team(&self, context: &OperationContext) -> Result<Vec<PersonnelNumber>> {
        let user = context.require_auth_user("team")?;
        let root = context.auth_position("team")?;

        if context.subordinates(&self.resolver, false).await?.is_empty() {
            return Err(DirectoryError::NoSubordinates {
                user_id: user.id.clone(),
            });
        }

        let occupied = context.subordinates(&self.resolver, true).await?;
        Ok(team::build_team(root, occupied, true))
    }

    /// Team below an arbitrary position
    pub async fn position_team(
        &self,
        root: &Position,
        is_my_team: bool,
    ) -> Result<Vec<PersonnelNumber>> {
        let occupied = self
            .resolver
            .resolve_occupied_subordinates(&root.id, true)
            .await?;
        Ok(team::build_team(root, &occupied, is_my_team))
    }

    /// The caller's subordinate positions, memoized in the context
    pub async fn direct_subordinates(
        &self,
        context: &OperationContext,
        include_vacancy_fallback: bool,
    ) -> Result<Vec<Position>> {
        Ok(context
            .subordinates(&self.resolver, include_vacancy_fallback)
            .await?
            .to_vec())
    }

    pub async fn resolve_occupied_subordinates(
        &self,
        root: &PositionId,
        include_vacancy_fallback: bool,
    ) -> Result<Vec<Position>> {
        self.resolver
            .resolve_occupied_subordinates(root, include_vacancy_fallback)
            .await
    }

    /// Fails unless `employee_id` holds one of the caller's subordinate
    /// positions
    pub async fn check_employee_in_team(
        &self,
        context: &OperationContext,
        employee_id: &PersonnelId,
    ) -> Result<()> {
        let user = context.require_auth_user("check_employee_in_team")?;
        let subordinates = context.subordinates(&self.resolver, true).await?;

        if subordinates.is_empty() {
            return Err(DirectoryError::NoSubordinates {
                user_id: user.id.clone(),
            });
        }
        if !holds_any(subordinates, employee_id) {
            return Err(DirectoryError::EmployeeNotInSubordinates {
                employee_id: employee_id.clone(),
            });
        }

        Ok(())
    }

    // Personnel

    pub async fn user_by_id(
        &self,
        context: &OperationContext,
        id: &PersonnelId,
    ) -> Result<PersonnelNumber> {
        if let Some(user) = context.cache().get_complete(id) {
            return Ok(user);
        }

        let user = self
            .fetcher
            .fetch_personnel(slice::from_ref(id))
            .await?
            .into_iter()
            .find(|user| &user.id == id)
            .ok_or_else(|| DirectoryError::UserNotFound { id: id.clone() })?;

        context.cache().record(&user);
        Ok(user)
    }

    /// Records for `ids` in first-seen order. Duplicates and blank ids are
    /// skipped; ids the directory does not know are left out.
    pub async fn users_by_ids(
        &self,
        context: &OperationContext,
        ids: &[PersonnelId],
    ) -> Result<Vec<PersonnelNumber>> {
        let mut seen = HashSet::new();
        let wanted: Vec<&PersonnelId> = ids
            .iter()
            .filter(|id| !id.is_blank() && seen.insert(*id))
            .collect();

        let missing: Vec<PersonnelId> = wanted
            .iter()
            .filter(|id| !context.cache().contains_complete(id))
            .map(|id| (*id).clone())
            .collect();

        let fetched = self.fetcher.fetch_personnel(&missing).await?;
        context.cache().record_all(&fetched);

        Ok(wanted
            .into_iter()
            .filter_map(|id| context.cache().get_complete(id))
            .collect())
    }

    /// Every personnel record seen by this context
    pub fn users_list(&self, context: &OperationContext) -> BTreeMap<PersonnelId, PersonnelNumber> {
        context.cache().users()
    }

    /// Resolve the caller, or one of the caller's subordinates.
    ///
    /// Without `employee_id` the caller is returned, refused with
    /// `IsALaborer` when `non_worker_only` is set and the caller is a
    /// laborer. With an id the employee must be in the caller's team, and
    /// `worker_only` refuses non-laborers with `NotALaborer`.
    pub async fn resolve_employee(
        &self,
        context: &OperationContext,
        employee_id: Option<&PersonnelId>,
        non_worker_only: bool,
        worker_only: bool,
    ) -> Result<UserProfile> {
        let user = match employee_id {
            None => {
                let user = context.require_auth_user("resolve_employee")?.clone();
                if non_worker_only && user.is_laborer() {
                    return Err(DirectoryError::IsALaborer { user_id: user.id });
                }
                user
            }
            Some(employee_id) => {
                let user = self.user_by_id(context, employee_id).await?;
                self.check_employee_in_team(context, employee_id).await?;
                if worker_only && !user.is_laborer() {
                    return Err(DirectoryError::NotALaborer {
                        employee_id: employee_id.clone(),
                    });
                }
                user
            }
        };

        let department_id = self.user_department(&user, false).await?.map(|d| d.id);
        Ok(UserProfile {
            id: user.id.clone(),
            department_id,
            position: user.current_position(false).cloned(),
            user,
        })
    }

    pub fn user_position<'a>(&self, user: &'a PersonnelNumber) -> Option<&'a Position> {
        user.current_position(false)
    }

    /// Department of the user's current position, classified, optionally
    /// with its manager position resolved
    pub async fn user_department(
        &self,
        user: &PersonnelNumber,
        with_manager: bool,
    ) -> Result<Option<Department>> {
        let Some(position) = user.current_position(false) else {
            return Ok(None);
        };
        let Some(department) = self.position_department(position).await? else {
            return Ok(None);
        };

        let mut department = self.classifier.classify(department);
        if with_manager {
            if let Some(manager_id) = department.manager_id.clone() {
                department.manager = self
                    .fetcher
                    .fetch_positions(slice::from_ref(&manager_id))
                    .await?
                    .into_iter()
                    .next()
                    .map(Box::new);
            }
        }

        Ok(Some(department))
    }

    /// The department the user heads through their current position
    pub async fn user_managed_department(
        &self,
        user: &PersonnelNumber,
    ) -> Result<Option<Department>> {
        let Some(position) = user.current_position(false) else {
            return Ok(None);
        };

        Ok(self
            .position_department(position)
            .await?
            .filter(|department| department.is_managed_by(&position.id))
            .map(|department| self.classifier.classify(department)))
    }

    /// Effective occupant of a position, holding just that position
    pub async fn position_occupant(
        &self,
        context: &OperationContext,
        position_id: &PositionId,
    ) -> Result<Option<PersonnelNumber>> {
        let position = self.position(position_id).await?;
        let occupant = team::revert_position(&position);
        if let Some(occupant) = &occupant {
            context.cache().record_partial(occupant);
        }
        Ok(occupant)
    }

    pub fn is_user_laborer(&self, user: &PersonnelNumber) -> bool {
        user.is_laborer()
    }

    pub fn is_position_laborer(&self, position: &Position) -> bool {
        position.is_worker()
    }

    pub fn is_user_mse(&self, user: &PersonnelNumber) -> bool {
        user.is_mse()
    }

    pub fn is_position_mse(&self, position: &Position) -> bool {
        position.is_mse()
    }

    pub fn has_position_subordinates(&self, position: &Position) -> bool {
        position.has_subordinates()
    }

    // Positions and departments

    pub async fn position(&self, position_id: &PositionId) -> Result<Position> {
        self.gateway.position(position_id).await.map_err(|cause| {
            if cause.is_not_found() {
                DirectoryError::PositionNotFound {
                    position_id: position_id.clone(),
                }
            } else {
                DirectoryError::logged_unavailable("position", position_id.to_string(), cause)
            }
        })
    }

    pub async fn positions(&self, ids: &[PositionId]) -> Result<Vec<Position>> {
        self.fetcher.fetch_positions(ids).await
    }

    pub async fn departments(&self, ids: &[DepartmentId]) -> Result<Vec<Department>> {
        Ok(self
            .fetcher
            .fetch_departments(ids)
            .await?
            .into_iter()
            .map(|department| self.classifier.classify(department))
            .collect())
    }

    /// `None` when the directory reports the department does not exist
    pub async fn department_by_id(&self, id: &DepartmentId) -> Result<Option<Department>> {
        match self.gateway.department(id).await {
            Ok(department) => Ok(Some(self.classifier.classify(department))),
            Err(cause) if cause.is_not_found() => {
                tracing::debug!(department_id = %id, "department not found");
                Ok(None)
            }
            Err(cause) => Err(DirectoryError::logged_unavailable(
                "department",
                id.to_string(),
                cause,
            )),
        }
    }

    pub async fn child_departments(&self, id: &DepartmentId) -> Result<Vec<Department>> {
        let children = self
            .gateway
            .department_children(id)
            .await
            .map_err(|cause| {
                DirectoryError::logged_unavailable("department_children", id.to_string(), cause)
            })?;

        Ok(children
            .into_iter()
            .map(|department| self.classifier.classify(department))
            .collect())
    }

    /// Every department below `id`
    pub async fn child_department_ids(&self, id: &DepartmentId) -> Result<Vec<DepartmentId>> {
        self.closure.child_department_ids(id).await
    }

    /// Departments keyed by id
    pub async fn departments_indexed(
        &self,
        ids: &[DepartmentId],
    ) -> Result<BTreeMap<DepartmentId, Department>> {
        Ok(self
            .departments(ids)
            .await?
            .into_iter()
            .map(|department| (department.id.clone(), department))
            .collect())
    }

    /// Only the requested fields of each department. Paths are dotted
    /// (`manager.name`); a path that runs into a missing or null value
    /// yields null.
    pub async fn department_fields(
        &self,
        ids: &[DepartmentId],
        fields: &[&str],
    ) -> Result<Vec<DepartmentFields>> {
        Ok(self
            .departments(ids)
            .await?
            .iter()
            .map(|department| project(department, fields))
            .collect())
    }

    pub async fn departments_with_company(
        &self,
        ids: &[DepartmentId],
    ) -> Result<Vec<Department>> {
        Ok(self
            .fetcher
            .fetch_departments_with_company(ids)
            .await?
            .into_iter()
            .map(|department| self.classifier.classify(department))
            .collect())
    }

    /// Open positions of the given departments, their own positions only
    pub async fn department_positions(
        &self,
        department_ids: &[DepartmentId],
    ) -> Result<Vec<Position>> {
        self.fetcher.fetch_department_positions(department_ids).await
    }

    pub async fn position_attributes(
        &self,
        ids: &[PositionId],
    ) -> Result<Vec<PositionAttributes>> {
        self.fetcher.fetch_position_attributes(ids).await
    }

    /// Whether `user_id` actively holds a position of `department_id`
    pub async fn is_user_in_department(
        &self,
        department_id: &DepartmentId,
        user_id: &PersonnelId,
    ) -> Result<bool> {
        let positions = self
            .department_positions(slice::from_ref(department_id))
            .await?;
        Ok(holds_any(&positions, user_id))
    }

    /// Number of positions per department. `with_depth` counts the whole
    /// subtree below each department as well. Every requested id gets an
    /// entry.
    pub async fn department_positions_count(
        &self,
        department_ids: &[DepartmentId],
        with_personnel_only: bool,
        with_depth: bool,
    ) -> Result<BTreeMap<DepartmentId, usize>> {
        let counted = |position: &Position| !with_personnel_only || position.is_occupied();
        let mut counts: BTreeMap<DepartmentId, usize> =
            department_ids.iter().map(|id| (id.clone(), 0)).collect();

        if !with_depth {
            let wanted: Vec<DepartmentId> = counts.keys().cloned().collect();
            for position in self.department_positions(&wanted).await? {
                if !counted(&position) {
                    continue;
                }
                if let Some(count) = counts.get_mut(&position.department_id) {
                    *count += 1;
                }
            }
            return Ok(counts);
        }

        for (department_id, count) in counts.iter_mut() {
            let mut subtree = self.closure.child_department_ids(department_id).await?;
            subtree.push(department_id.clone());

            *count = self
                .department_positions(&subtree)
                .await?
                .iter()
                .filter(|&position| counted(position))
                .count();
        }

        Ok(counts)
    }

    /// Root of the department tree with its direct children. Grandchildren
    /// are not included.
    pub async fn top_departments(&self) -> Result<Option<Department>> {
        let roots = self.gateway.top_departments(true).await.map_err(|cause| {
            DirectoryError::logged_unavailable("top_departments", "", cause)
        })?;

        Ok(roots.into_iter().next().map(|mut top| {
            for child in &mut top.children {
                child.children.clear();
            }
            self.classifier.classify(top)
        }))
    }

    // Permissions

    pub async fn are_departments_in_user_management(
        &self,
        context: &OperationContext,
        department_ids: &[DepartmentId],
    ) -> Result<bool> {
        let user = context.require_auth_user("are_departments_in_user_management")?;
        self.permissions.can_manage(user, department_ids).await
    }

    /// `false` when there is no position to check
    pub async fn is_position_in_subordinates(
        &self,
        context: &OperationContext,
        position: Option<&Position>,
    ) -> Result<bool> {
        match position {
            Some(position) => {
                self.permissions
                    .is_position_in_subordinates(context, position)
                    .await
            }
            None => Ok(false),
        }
    }

    async fn position_department(&self, position: &Position) -> Result<Option<Department>> {
        match &position.department {
            Some(department) => Ok(Some(department.as_ref().clone())),
            None => self.department_by_id(&position.department_id).await,
        }
    }
}

fn project(department: &Department, fields: &[&str]) -> DepartmentFields {
    let value = serde_json::to_value(department).unwrap_or_default();

    let mut projected = DepartmentFields::new();
    projected.insert("id".to_string(), serde_json::json!(department.id));
    for field in fields {
        let picked = field
            .split('.')
            .try_fold(&value, |current, key| current.get(key))
            .cloned()
            .unwrap_or_default();
        projected.insert((*field).to_string(), picked);
    }
    projected
}
