//! Per-carrier translation of status codes into [`CanonicalStatus`].
use crate::model::CanonicalStatus;
use std::collections::HashMap;

/// Case-insensitive code → canonical status map.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    entries: HashMap<String, CanonicalStatus>,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, code: &str, status: CanonicalStatus) -> Self {
        self.entries.insert(normalize(code), status);
        self
    }

    pub fn translate(&self, code: &str) -> Option<CanonicalStatus> {
        self.entries.get(&normalize(code)).copied()
    }
}

impl<const N: usize> From<[(&str, CanonicalStatus); N]> for StatusTable {
    fn from(entries: [(&str, CanonicalStatus); N]) -> Self {
        entries
            .into_iter()
            .fold(StatusTable::new(), |table, (code, status)| table.with(code, status))
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let table = StatusTable::from([
            ("PICKED_UP", CanonicalStatus::Preparing),
            ("Delivered", CanonicalStatus::Delivered),
        ]);
        assert_eq!(table.translate("picked_up"), Some(CanonicalStatus::Preparing));
        assert_eq!(table.translate(" DELIVERED "), Some(CanonicalStatus::Delivered));
        assert_eq!(table.translate("lost_in_space"), None);
    }
}
