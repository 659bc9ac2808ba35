//! Team views
//!
//! A team member is a copy of a personnel record whose only position is the
//! occupied position it was found on, annotated with the root of the
//! traversal. Fetched entities are never modified; everything here returns
//! new values.

use std::collections::HashSet;

use crate::entities::{PersonnelNumber, Position, PositionPivot};

/// One member per active incumbent of each occupied position.
///
/// Positions keep their order; within a position incumbents keep service
/// order. A person appears at most once per position.
pub fn build_team(root: &Position, occupied: &[Position], is_my_team: bool) -> Vec<PersonnelNumber> {
    let mut seen = HashSet::new();
    let mut team = Vec::new();

    for position in occupied {
        for incumbent in position.active_incumbents(false) {
            if !seen.insert((&position.id, &incumbent.id)) {
                continue;
            }
            team.push(team_member(root, position, incumbent, is_my_team));
        }
    }

    tracing::debug!(root = %root.id, members = team.len(), is_my_team, "built team");
    team
}

fn team_member(
    root: &Position,
    position: &Position,
    incumbent: &PersonnelNumber,
    is_my_team: bool,
) -> PersonnelNumber {
    let mut annotated = position.without_personnel();
    annotated.personnel_numbers = vec![incumbent.without_positions()];
    annotated.employment = incumbent.employment.clone();
    annotated.pivot = Some(PositionPivot {
        global_position_id: root.id.clone(),
        global_position_name: root.name.clone(),
        is_my_team,
    });

    let mut member = incumbent.without_positions();
    member.positions = vec![annotated];
    member
}

/// The position's effective occupant, holding just this position
pub fn revert_position(position: &Position) -> Option<PersonnelNumber> {
    let occupant = position.occupant(false)?;

    let mut held = position.without_personnel();
    held.employment = occupant.employment.clone();

    let mut user = occupant.without_positions();
    user.positions = vec![held];
    Some(user)
}

/// The person's current position, listing just this person as incumbent
pub fn revert_personnel_number(user: &PersonnelNumber) -> Option<Position> {
    let current = user.current_position(false)?;

    let mut incumbent = user.without_positions();
    incumbent.employment = current.employment.clone();

    let mut position = current.clone();
    position.personnel_numbers = vec![incumbent];
    Some(position)
}
