//! Live action timeline: stable ordering plus expiry filtering.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::action::Action;

/// Actions sorted ascending by trigger time, ties in insertion order, with
/// every strictly expired action removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    actions: Vec<Action>,
}

/// Sort (stable) and drop actions whose expiry is strictly before `now`.
///
/// Deterministic and idempotent: normalizing an already-normalized timeline
/// with the same `now` yields it unchanged.
pub fn normalize(mut actions: Vec<Action>, now: DateTime<Utc>) -> Timeline {
    actions.sort_by_key(|a| a.trigger);
    actions.retain(|a| !a.is_expired_at(now));
    Timeline { actions }
}

impl Timeline {
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// Earliest trigger strictly after `now`.
    pub fn next_trigger_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.actions
            .iter()
            .map(|a| a.trigger)
            .find(|trigger| *trigger > now)
    }

    /// Every action whose trigger is at or before `now`, in timeline order.
    pub fn due(&self, now: DateTime<Utc>) -> &[Action] {
        let end = self.actions.partition_point(|a| a.trigger <= now);
        &self.actions[..end]
    }

    /// Actions currently open (`trigger <= now <= expires`).
    pub fn open_at(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Action> + '_ {
        self.actions.iter().filter(move |a| a.is_open_at(now))
    }

    /// Drop actions whose expiry is strictly before `now`; returns how many.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.actions.len();
        self.actions.retain(|a| !a.is_expired_at(now));
        before - self.actions.len()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
