//! Scored set ordered by (score, member), as ZADD / ZREM / ZRANGE see it

use ahash::AHashMap;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// f64 with a total order so it can key the ordered index.
#[derive(Clone, Copy, Debug)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScoredSet {
    /// O(1) score lookup by member
    members: AHashMap<String, f64>,
    /// Members in ZRANGE order
    ordered: BTreeSet<(Score, String)>,
}

impl ScoredSet {
    pub fn new() -> Self {
        ScoredSet {
            members: AHashMap::new(),
            ordered: BTreeSet::new(),
        }
    }

    /// VOPR: Verify all invariants hold for this sorted set
    #[cfg(debug_assertions)]
    fn verify_invariants(&self) {
        debug_assert_eq!(
            self.members.len(),
            self.ordered.len(),
            "Invariant violated: members.len() ({}) != ordered.len() ({})",
            self.members.len(),
            self.ordered.len()
        );
        for (member, score) in &self.members {
            debug_assert!(
                self.ordered.contains(&(Score(*score), member.clone())),
                "Invariant violated: member '{}' with score {} missing from ordered index",
                member,
                score
            );
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn verify_invariants(&self) {}

    /// Add member with score. Returns true if new member, false if updated.
    pub fn add(&mut self, member: &str, score: f64) -> bool {
        use std::collections::hash_map::Entry;

        let added = match self.members.entry(member.to_string()) {
            Entry::Occupied(mut entry) => {
                let old_score = *entry.get();
                if old_score.total_cmp(&score) != Ordering::Equal {
                    entry.insert(score);
                    self.ordered.remove(&(Score(old_score), member.to_string()));
                    self.ordered.insert((Score(score), member.to_string()));
                }
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(score);
                self.ordered.insert((Score(score), member.to_string()));
                true
            }
        };

        debug_assert_eq!(
            self.members.get(member).copied().map(Score),
            Some(Score(score)),
            "Postcondition violated: member must carry the new score"
        );
        self.verify_invariants();
        added
    }

    /// Remove member. Returns true if removed.
    pub fn remove(&mut self, member: &str) -> bool {
        let removed = match self.members.remove(member) {
            Some(score) => {
                self.ordered.remove(&(Score(score), member.to_string()));
                true
            }
            None => false,
        };

        debug_assert!(
            !self.members.contains_key(member),
            "Postcondition violated: member must not exist after remove"
        );
        self.verify_invariants();
        removed
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.members.get(member).copied()
    }

    /// Members by rank [start, stop] (inclusive), negative indices count
    /// from the end.
    pub fn range(&self, start: isize, stop: isize) -> Vec<String> {
        let len = self.ordered.len() as isize;
        if len == 0 {
            return Vec::new();
        }

        let start = if start < 0 {
            (len + start).max(0)
        } else {
            start.min(len)
        };
        let stop = if stop < 0 {
            (len + stop).max(-1)
        } else {
            stop.min(len - 1)
        };

        if start > stop || start >= len {
            return Vec::new();
        }

        self.ordered
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|(_, member)| member.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl PartialEq for ScoredSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}
