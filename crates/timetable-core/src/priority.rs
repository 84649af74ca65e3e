//! Group ranks used to break ties between competing overrides.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::GroupId;

/// A user's standing in one group.
///
/// Ordered by `priority`, then by `joined_at`; a higher priority wins, and
/// between equal priorities the more recent membership wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupRank {
    pub priority: i64,
    pub joined_at: DateTime<Utc>,
}

/// Looks up a user's rank in a group.
///
/// `None` means the user is not a member of that group.
pub trait GroupPriority {
    fn rank(&self, group: &GroupId) -> Option<GroupRank>;

    /// Highest rank the user holds among `groups`.
    fn best_rank<'a, I>(&self, groups: I) -> Option<GroupRank>
    where
        I: IntoIterator<Item = &'a GroupId>,
        Self: Sized,
    {
        groups.into_iter().filter_map(|group| self.rank(group)).max()
    }
}

/// One user's group memberships.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memberships {
    ranks: HashMap<GroupId, GroupRank>,
}

impl Memberships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, group: GroupId, rank: GroupRank) {
        self.ranks.insert(group, rank);
    }

    /// Groups the user belongs to, sorted for stable query parameters.
    pub fn groups(&self) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = self.ranks.keys().cloned().collect();
        groups.sort();
        groups
    }

    pub fn contains(&self, group: &GroupId) -> bool {
        self.ranks.contains_key(group)
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }
}

impl GroupPriority for Memberships {
    fn rank(&self, group: &GroupId) -> Option<GroupRank> {
        self.ranks.get(group).copied()
    }
}

impl FromIterator<(GroupId, GroupRank)> for Memberships {
    fn from_iter<T: IntoIterator<Item = (GroupId, GroupRank)>>(iter: T) -> Self {
        Self {
            ranks: iter.into_iter().collect(),
        }
    }
}
