//! Directory entities as decoded from the directory service
//!
//! Entities are plain values. Anything that derives new information from a
//! fetched entity (team pivots, reverted views) builds a new value and leaves
//! the fetched one untouched, so copies held by a cache stay intact.

pub mod serde_helpers;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::id::{DepartmentId, PersonnelId, PositionId};
use serde_helpers::{lenient_date, map_or_empty_list, null_as_default, null_as_false};

/// Global permission tags
pub mod permissions {
    /// Grants every administrative check
    pub const SUPER_ADMIN: &str = "super_admin";
}

/// Per-department permission tags
pub mod department_permissions {
    /// Administers the department and its descendants
    pub const ADMIN: &str = "admin";
}

/// Assignment details shared by a person on a position and a position held
/// by a person. Which side carries them depends on how the entity was
/// nested in the response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Employment {
    #[serde(default)]
    pub employment_percent: Option<f64>,

    #[serde(default, deserialize_with = "null_as_false")]
    pub is_acting: bool,
}

impl Employment {
    pub fn new(employment_percent: Option<f64>, is_acting: bool) -> Self {
        Self {
            employment_percent,
            is_acting,
        }
    }

    /// Acting assignments never count. Otherwise a positive percent counts,
    /// an unspecified (`null`) percent counts, and a zero percent counts only
    /// when `include_empty_percent` is set.
    pub fn is_active(&self, include_empty_percent: bool) -> bool {
        if self.is_acting {
            return false;
        }

        match self.employment_percent {
            None => true,
            Some(percent) => percent > 0.0 || include_empty_percent,
        }
    }
}

/// Where a team member was discovered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPivot {
    /// Root position of the traversal that found this member
    pub global_position_id: PositionId,
    pub global_position_name: String,
    /// Whether the root is the caller's own position
    pub is_my_team: bool,
}

/// A seat within a department, vacant or occupied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    pub department_id: DepartmentId,

    /// Inlined by some endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Box<Department>>,

    /// Current and former incumbents, in service order
    #[serde(default, deserialize_with = "null_as_default")]
    pub personnel_numbers: Vec<PersonnelNumber>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subordinates_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_worker: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mse: Option<bool>,

    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<NaiveDate>,

    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,

    /// Set when this position is nested under the person holding it
    #[serde(flatten)]
    pub employment: Employment,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot: Option<PositionPivot>,
}

impl Position {
    pub fn new(
        id: impl Into<PositionId>,
        name: impl Into<String>,
        department_id: impl Into<DepartmentId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            department_id: department_id.into(),
            department: None,
            personnel_numbers: Vec::new(),
            subordinates_count: None,
            is_worker: None,
            is_mse: None,
            start_date: None,
            end_date: None,
            employment: Employment::default(),
            pivot: None,
        }
    }

    pub fn with_incumbents(mut self, personnel_numbers: Vec<PersonnelNumber>) -> Self {
        self.personnel_numbers = personnel_numbers;
        self
    }

    /// Incumbents that currently hold the position
    pub fn active_incumbents(
        &self,
        include_empty_percent: bool,
    ) -> impl Iterator<Item = &PersonnelNumber> {
        self.personnel_numbers
            .iter()
            .filter(move |person| person.employment.is_active(include_empty_percent))
    }

    /// The position's effective occupant
    pub fn occupant(&self, include_empty_percent: bool) -> Option<&PersonnelNumber> {
        self.active_incumbents(include_empty_percent).next()
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant(false).is_some()
    }

    /// Unknown classification counts as not a worker
    pub fn is_worker(&self) -> bool {
        self.is_worker.unwrap_or(false)
    }

    pub fn is_mse(&self) -> bool {
        self.is_mse.unwrap_or(false)
    }

    pub fn has_subordinates(&self) -> bool {
        self.subordinates_count.is_some_and(|count| count > 0)
    }

    /// Copy without incumbents, for nesting under a person
    pub fn without_personnel(&self) -> Self {
        Self {
            personnel_numbers: Vec::new(),
            ..self.clone()
        }
    }
}

/// An employee record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonnelNumber {
    pub id: PersonnelId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Set when this person is nested under a position
    #[serde(flatten)]
    pub employment: Employment,

    /// Global permission tags
    #[serde(default, deserialize_with = "null_as_default")]
    pub permissions: BTreeSet<String>,

    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub department_permissions: BTreeMap<DepartmentId, BTreeSet<String>>,

    /// Positions held, current first when the service orders them
    #[serde(default, deserialize_with = "null_as_default")]
    pub positions: Vec<Position>,
}

impl PersonnelNumber {
    pub fn new(id: impl Into<PersonnelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            employment: Employment::default(),
            permissions: BTreeSet::new(),
            department_permissions: BTreeMap::new(),
            positions: Vec::new(),
        }
    }

    pub fn with_employment(mut self, employment_percent: Option<f64>, is_acting: bool) -> Self {
        self.employment = Employment::new(employment_percent, is_acting);
        self
    }

    pub fn with_positions(mut self, positions: Vec<Position>) -> Self {
        self.positions = positions;
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn with_department_permission(
        mut self,
        department_id: impl Into<DepartmentId>,
        permission: impl Into<String>,
    ) -> Self {
        self.department_permissions
            .entry(department_id.into())
            .or_default()
            .insert(permission.into());
        self
    }

    pub fn is_active(&self, include_empty_percent: bool) -> bool {
        self.employment.is_active(include_empty_percent)
    }

    /// The first held position whose assignment is active
    pub fn current_position(&self, include_empty_percent: bool) -> Option<&Position> {
        self.positions
            .iter()
            .find(|position| position.employment.is_active(include_empty_percent))
    }

    /// Holds a worker position. Without a current position this is false.
    pub fn is_laborer(&self) -> bool {
        self.current_position(false).is_some_and(Position::is_worker)
    }

    pub fn is_mse(&self) -> bool {
        self.current_position(false).is_some_and(Position::is_mse)
    }

    /// Copy without held positions, for nesting under a position
    pub fn without_positions(&self) -> Self {
        Self {
            positions: Vec::new(),
            ..self.clone()
        }
    }
}

/// An organizational unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Position id of the department head
    #[serde(default)]
    pub manager_id: Option<PositionId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<DepartmentId>,

    /// Filled once by a classifier and never recomputed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_brigade: Option<bool>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<Department>,

    /// Resolved manager position, only when explicitly requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<Box<Position>>,

    /// Owning company, present only when requested with the department
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
}

impl Department {
    pub fn new(id: impl Into<DepartmentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            manager_id: None,
            parent_id: None,
            is_brigade: None,
            children: Vec::new(),
            manager: None,
            company: None,
        }
    }

    pub fn with_manager(mut self, manager_id: impl Into<PositionId>) -> Self {
        self.manager_id = Some(manager_id.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<DepartmentId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_company(mut self, company: Company) -> Self {
        self.company = Some(company);
        self
    }

    pub fn is_managed_by(&self, position_id: &PositionId) -> bool {
        self.manager_id.as_ref() == Some(position_id)
    }
}

/// Legal entity a department belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Free-form attributes attached to a position by the directory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionAttributes {
    #[serde(alias = "id")]
    pub position_id: PositionId,

    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}
