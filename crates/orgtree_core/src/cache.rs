//! Personnel records seen during one logical operation
//!
//! The cache lives exactly as long as the `OperationContext` that owns it.
//! Nothing is evicted; a record fetched again replaces the earlier copy.
//!
//! Records met during traversal only carry the position they were found on,
//! so they are kept as partial. Lookups by id serve complete records only.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::entities::{PersonnelNumber, Position};
use crate::id::PersonnelId;

#[derive(Debug, Clone)]
struct Cached {
    user: PersonnelNumber,
    complete: bool,
}

#[derive(Debug, Default)]
pub struct RequestScopedCache {
    users: RwLock<BTreeMap<PersonnelId, Cached>>,
}

impl RequestScopedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a full personnel record, replacing any earlier copy
    pub fn record(&self, user: &PersonnelNumber) {
        self.record_all([user]);
    }

    pub fn record_all<'a>(&self, users: impl IntoIterator<Item = &'a PersonnelNumber>) {
        let mut cached = self.users.write();
        for user in users {
            cached.insert(
                user.id.clone(),
                Cached {
                    user: user.clone(),
                    complete: true,
                },
            );
        }
    }

    /// Record a cut-down record unless the id is already known
    pub fn record_partial(&self, user: &PersonnelNumber) {
        self.users
            .write()
            .entry(user.id.clone())
            .or_insert_with(|| Cached {
                user: user.clone(),
                complete: false,
            });
    }

    /// Record everyone actively holding one of `positions`, with the held
    /// position attached. Records already present are kept as they are.
    pub fn record_incumbents(&self, positions: &[Position]) {
        let mut cached = self.users.write();
        for position in positions {
            for incumbent in position.active_incumbents(false) {
                cached
                    .entry(incumbent.id.clone())
                    .or_insert_with(|| Cached {
                        user: held_by(position, incumbent),
                        complete: false,
                    });
            }
        }
    }

    /// Any record seen for `id`, partial or not
    pub fn get(&self, id: &PersonnelId) -> Option<PersonnelNumber> {
        self.users.read().get(id).map(|cached| cached.user.clone())
    }

    /// The record for `id` if it came from a full lookup
    pub fn get_complete(&self, id: &PersonnelId) -> Option<PersonnelNumber> {
        self.users
            .read()
            .get(id)
            .filter(|cached| cached.complete)
            .map(|cached| cached.user.clone())
    }

    pub fn contains(&self, id: &PersonnelId) -> bool {
        self.users.read().contains_key(id)
    }

    pub fn contains_complete(&self, id: &PersonnelId) -> bool {
        self.users.read().get(id).is_some_and(|cached| cached.complete)
    }

    /// Every record seen so far, keyed by id
    pub fn users(&self) -> BTreeMap<PersonnelId, PersonnelNumber> {
        self.users
            .read()
            .iter()
            .map(|(id, cached)| (id.clone(), cached.user.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

fn held_by(position: &Position, incumbent: &PersonnelNumber) -> PersonnelNumber {
    let mut held = position.without_personnel();
    held.employment = incumbent.employment.clone();

    let mut user = incumbent.without_positions();
    user.positions = vec![held];
    user
}
