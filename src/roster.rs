use crate::model::PoolId;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read roster file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse roster file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate pool id {0} in roster")]
    DuplicateId(PoolId),
}

pub type Result<T> = std::result::Result<T, RosterError>;

#[derive(Debug, Deserialize)]
struct RosterFile {
    data: RosterData,
}

#[derive(Debug, Deserialize)]
struct RosterData {
    spos: Vec<SpoEntry>,
}

#[derive(Debug, Deserialize)]
struct SpoEntry {
    id: PoolId,
    ticker: String,
    name: String,
}

/// Candidate roster: pool id -> display label. Loaded once, fixed for the
/// run; the set of valid pool ids never grows after extraction begins.
#[derive(Debug, Clone)]
pub struct Roster {
    labels: BTreeMap<PoolId, String>,
}

impl Roster {
    /// Load the SPO roster JSON (`data.spos[]`). Pools with an empty ticker
    /// fall back to their full name as the display label.
    pub fn load(path: &Path) -> Result<Roster> {
        let raw = fs::read_to_string(path)?;
        let file: RosterFile = serde_json::from_str(&raw)?;
        Roster::from_entries(file.data.spos.into_iter().map(|spo| {
            let label = if spo.ticker.is_empty() {
                spo.name
            } else {
                spo.ticker
            };
            (spo.id, label)
        }))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (PoolId, String)>) -> Result<Roster> {
        let mut labels = BTreeMap::new();
        for (id, label) in entries {
            if labels.insert(id, label).is_some() {
                return Err(RosterError::DuplicateId(id));
            }
        }
        Ok(Roster { labels })
    }

    pub fn contains(&self, id: PoolId) -> bool {
        self.labels.contains_key(&id)
    }

    pub fn label(&self, id: PoolId) -> &str {
        self.labels.get(&id).map(String::as_str).unwrap_or("?")
    }

    /// Pool ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.labels.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolId, &str)> + '_ {
        self.labels.iter().map(|(id, label)| (*id, label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": {
            "spos": [
                {"id": 123, "ticker": "AAA", "name": "Pool A"},
                {"id": 456, "ticker": "", "name": "Pool B"}
            ]
        }
    }"#;

    #[test]
    fn parses_roster_and_falls_back_to_name() {
        let file: RosterFile = serde_json::from_str(SAMPLE).unwrap();
        let roster = Roster::from_entries(file.data.spos.into_iter().map(|spo| {
            let label = if spo.ticker.is_empty() {
                spo.name
            } else {
                spo.ticker
            };
            (spo.id, label)
        }))
        .unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.label(123), "AAA");
        assert_eq!(roster.label(456), "Pool B");
        assert!(roster.contains(123));
        assert!(!roster.contains(999));
    }

    #[test]
    fn empty_roster_is_empty() {
        let roster = Roster::from_entries(Vec::new()).unwrap();
        assert!(roster.is_empty());
        assert_eq!(roster.len(), 0);
    }

    #[test]
    fn rejects_duplicate_pool_ids() {
        let err = Roster::from_entries(vec![
            (7, "ONE".to_string()),
            (7, "TWO".to_string()),
        ])
        .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateId(7)));
    }
}
