//! Unordered set of stats-key identifiers (SADD / SMEMBERS)

use ahash::AHashSet;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemberSet {
    members: AHashSet<String>,
}

impl MemberSet {
    pub fn new() -> Self {
        MemberSet {
            members: AHashSet::new(),
        }
    }

    /// VOPR: Verify all invariants hold for this set
    #[cfg(debug_assertions)]
    fn verify_invariants(&self) {
        debug_assert_eq!(
            self.is_empty(),
            self.members.is_empty(),
            "Invariant violated: is_empty() must equal members.is_empty()"
        );
        debug_assert_eq!(
            self.members().len(),
            self.len(),
            "Invariant violated: members().len() must equal len()"
        );
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn verify_invariants(&self) {}

    /// Returns true if the member was not present before.
    pub fn add(&mut self, member: &str) -> bool {
        #[cfg(debug_assertions)]
        let pre_len = self.members.len();
        #[cfg(debug_assertions)]
        let already_exists = self.members.contains(member);

        let inserted = self.members.insert(member.to_string());

        // TigerStyle: Postconditions
        debug_assert!(
            self.members.contains(member),
            "Postcondition violated: member must exist after add"
        );
        #[cfg(debug_assertions)]
        {
            debug_assert_eq!(
                inserted, !already_exists,
                "Postcondition violated: insert result must match prior non-existence"
            );
            let expected_len = if already_exists { pre_len } else { pre_len + 1 };
            debug_assert_eq!(
                self.members.len(),
                expected_len,
                "Postcondition violated: len must be correct after add"
            );
        }

        self.verify_invariants();
        inserted
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.contains(member)
    }

    pub fn members(&self) -> Vec<String> {
        self.members.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
