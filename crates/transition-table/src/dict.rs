//! Checksum-keyed dictionary over a sorted vector.
//!
//! Entries are kept sorted by checksum. A lookup binary-searches for the first entry whose checksum
//! is >= the target and scans forward over equal checksums, asking the caller to confirm each
//! candidate; a rejected candidate is a checksum collision.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry<Id> {
    checksum: u32,
    id: Id,
}

#[derive(Debug)]
pub(crate) struct ChecksumDict<Id> {
    entries: Vec<Entry<Id>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Lookup<Id> {
    pub found: Option<Id>,
    /// Candidates that matched the checksum but not the full compare.
    pub collisions: usize,
}

impl<Id: Copy + PartialEq> ChecksumDict<Id> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn find(&self, checksum: u32, mut is_match: impl FnMut(Id) -> bool) -> Lookup<Id> {
        let start = self.entries.partition_point(|e| e.checksum < checksum);
        let mut collisions = 0;
        for entry in self.entries[start..]
            .iter()
            .take_while(|e| e.checksum == checksum)
        {
            if is_match(entry.id) {
                return Lookup {
                    found: Some(entry.id),
                    collisions,
                };
            }
            collisions += 1;
        }
        Lookup {
            found: None,
            collisions,
        }
    }

    /// Inserts after any entries with the same checksum.
    pub fn insert(&mut self, checksum: u32, id: Id) {
        let at = self.entries.partition_point(|e| e.checksum <= checksum);
        self.entries.insert(at, Entry { checksum, id });
    }

    pub fn remove(&mut self, id: Id) {
        self.entries.retain(|e| e.id != id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    fn checksums(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.checksum).collect()
    }
}
