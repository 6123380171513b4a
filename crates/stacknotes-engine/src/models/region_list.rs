use std::fmt;

/// Stable identity of an editing region.
///
/// Minted from a counter owned by [`RegionList`]; never reused while the list
/// lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(u64);

impl RegionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub id: RegionId,
    pub is_empty: bool,
}

impl Region {
    pub fn new(id: RegionId, is_empty: bool) -> Self {
        Self { id, is_empty }
    }
}

/// Regions created and removed by one structural update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionListChange {
    pub added: Vec<RegionId>,
    pub removed: Vec<RegionId>,
}

impl RegionListChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The ordered list of editing regions, in display order.
///
/// Keeps one blank slot at the tail: the list is never empty, the last region
/// is always empty, and no two trailing regions are empty at once. Regions in
/// the middle of the list that become empty stay where they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionList {
    regions: Vec<Region>,
    next_id: u64,
}

impl Default for RegionList {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionList {
    /// A single blank region with id 1
    pub fn new() -> Self {
        Self {
            regions: vec![Region::new(RegionId(1), true)],
            next_id: 2,
        }
    }

    /// Rebuild from persisted regions, ordered by id and normalised.
    ///
    /// The returned change lists the blank slot appended at the tail, if any,
    /// and the surplus trailing blanks that were dropped.
    pub fn restore(entries: impl IntoIterator<Item = Region>) -> (Self, RegionListChange) {
        let mut regions: Vec<Region> = entries.into_iter().collect();
        regions.sort_by_key(|region| region.id);
        regions.dedup_by_key(|region| region.id);

        let Some(max_id) = regions.last().map(|region| region.id.0) else {
            let list = Self::new();
            let change = RegionListChange {
                added: vec![RegionId(1)],
                removed: Vec::new(),
            };
            return (list, change);
        };

        let mut list = Self {
            regions,
            next_id: max_id + 1,
        };
        let change = list.normalize();
        (list, change)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|region| region.id == id)
    }

    pub fn position(&self, id: RegionId) -> Option<usize> {
        self.regions.iter().position(|region| region.id == id)
    }

    pub fn last(&self) -> Option<&Region> {
        self.regions.last()
    }

    pub fn ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.regions.iter().map(|region| region.id)
    }

    /// Record that region `id` became empty or non-empty.
    ///
    /// Unknown ids and unchanged flags are ignored. Otherwise a blank slot is
    /// appended when the tail region gained content, and a run of trailing
    /// blank regions collapses to its first member.
    pub fn on_emptiness_changed(&mut self, id: RegionId, is_empty: bool) -> RegionListChange {
        let Some(region) = self.regions.iter_mut().find(|region| region.id == id) else {
            return RegionListChange::default();
        };
        if region.is_empty == is_empty {
            return RegionListChange::default();
        }
        region.is_empty = is_empty;
        self.normalize()
    }

    fn normalize(&mut self) -> RegionListChange {
        let mut change = RegionListChange::default();

        if self.regions.last().is_none_or(|region| !region.is_empty) {
            let id = self.mint();
            self.regions.push(Region::new(id, true));
            change.added.push(id);
        }

        // keep the earliest of the trailing blanks, it is the one being edited
        while let [.., before, last] = self.regions.as_slice()
            && before.is_empty
            && last.is_empty
        {
            if let Some(removed) = self.regions.pop() {
                change.removed.push(removed.id);
            }
        }

        change
    }

    fn mint(&mut self) -> RegionId {
        let id = RegionId(self.next_id);
        self.next_id += 1;
        id
    }
}
