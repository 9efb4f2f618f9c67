//! String interning with small integer ids.
//!
//! Ids are handed out in first-seen order starting at 1; 0 is never issued
//! and always reads back as absent.

/// A single interned name.
#[derive(Debug, Clone)]
struct NameEntry {
    id: u64,
    name: String,
}

/// Interning cache living for the duration of one collection run.
#[derive(Debug, Clone)]
pub struct NameManager {
    entries: Vec<NameEntry>,
    next_id: u64,
}

impl Default for NameManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NameManager {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Returns the id of `name`, interning it if this is the first sighting.
    pub fn add(&mut self, name: &str) -> u64 {
        if let Some(e) = self.entries.iter().find(|e| e.name == name) {
            return e.id;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(NameEntry {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn get(&self, id: u64) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_same_name_twice_returns_same_id() {
        let mut nm = NameManager::new();
        let a = nm.add("TCP");
        let b = nm.add("TCP");
        assert_eq!(a, b);
        assert_eq!(nm.len(), 1);
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut nm = NameManager::new();
        assert_eq!(nm.add("UNIX"), 1);
        assert_eq!(nm.add("TCP"), 2);
        assert_eq!(nm.add("UDP"), 3);
        assert_eq!(nm.add("TCP"), 2);
    }

    #[test]
    fn test_get_round_trips_and_zero_is_absent() {
        let mut nm = NameManager::new();
        let id = nm.add("NETLINK");
        assert_eq!(nm.get(id), Some("NETLINK"));
        assert_eq!(nm.get(0), None);
        assert_eq!(nm.get(42), None);
        assert!(NameManager::default().get(0).is_none());
    }
}
