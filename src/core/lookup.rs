//! CDOA to DSM mapping, loaded once per form session.

use std::collections::HashSet;

use tracing::{error, info, warn};

use crate::domain::{Keyed, LookupPair};
use crate::errors::{FormError, Result};
use crate::sharepoint::ListApi;

/// Loaded mapping list, read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    pairs: Vec<LookupPair>,
}

impl LookupTable {
    /// Builds a table keeping the first pair seen for each CDOA id.
    pub fn new(pairs: Vec<LookupPair>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(pairs.len());
        for pair in pairs {
            if seen.insert(pair.cdoa.id) {
                unique.push(pair);
            } else {
                warn!(cdoa_id = pair.cdoa.id, "duplicate CDOA id in lookup list ignored");
            }
        }
        Self { pairs: unique }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `(key, text)` options of the CDOA dropdown.
    pub fn cdoa_options(&self) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .map(|pair| (pair.cdoa.key(), pair.cdoa.title.clone()))
            .collect()
    }

    pub fn find_by_cdoa_id(&self, id: i64) -> Option<&LookupPair> {
        self.pairs.iter().find(|pair| pair.cdoa.id == id)
    }

    /// Pair selected by a CDOA dropdown key; a miss is an explicit error.
    pub fn resolve_cdoa(&self, key: &str) -> Result<&LookupPair> {
        key.trim()
            .parse::<i64>()
            .ok()
            .and_then(|id| self.find_by_cdoa_id(id))
            .ok_or_else(|| FormError::CdoaNotFound(key.to_string()))
    }
}

/// Loading state of the lookup data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LookupState {
    /// Not loaded; stays here when the fetch fails.
    #[default]
    Pending,
    Loaded(LookupTable),
}

impl LookupState {
    pub fn table(&self) -> Option<&LookupTable> {
        match self {
            LookupState::Pending => None,
            LookupState::Loaded(table) => Some(table),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LookupState::Loaded(_))
    }
}

/// Reads the mapping list behind `url` and decodes each item.
pub async fn fetch_lookup_table<A: ListApi + ?Sized>(api: &A, url: &str) -> Result<LookupTable> {
    let items = api.get_items(url).await?;
    let pairs = items
        .into_iter()
        .map(serde_json::from_value::<LookupPair>)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(LookupTable::new(pairs))
}

/// One-shot load without retry: failures are logged and leave `Pending`.
pub async fn load_lookup<A: ListApi + ?Sized>(api: &A, url: &str) -> LookupState {
    match fetch_lookup_table(api, url).await {
        Ok(table) => {
            info!(pairs = table.len(), "lookup data loaded");
            LookupState::Loaded(table)
        }
        Err(err) => {
            error!(%err, url, "failed to load lookup data");
            LookupState::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LookupRef;

    fn pair(cdoa: i64, cdoa_title: &str, dsm: i64, dsm_title: &str) -> LookupPair {
        LookupPair::new(LookupRef::new(cdoa, cdoa_title), LookupRef::new(dsm, dsm_title))
    }

    #[test]
    fn duplicate_cdoa_ids_keep_first() {
        let table = LookupTable::new(vec![
            pair(1, "Ann", 10, "Bo"),
            pair(1, "Ann again", 11, "Cy"),
            pair(2, "Dee", 12, "Ed"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.find_by_cdoa_id(1).unwrap().dsm.title, "Bo");
    }

    #[test]
    fn options_use_id_keys() {
        let table = LookupTable::new(vec![pair(5, "Ann", 10, "Bo")]);
        assert_eq!(table.cdoa_options(), vec![("5".to_string(), "Ann".to_string())]);
    }

    #[test]
    fn resolve_reports_missing_selection() {
        let table = LookupTable::new(vec![pair(5, "Ann", 10, "Bo")]);
        assert_eq!(table.resolve_cdoa("5").unwrap().dsm.id, 10);
        assert!(matches!(table.resolve_cdoa("6"), Err(FormError::CdoaNotFound(key)) if key == "6"));
        assert!(matches!(table.resolve_cdoa("x"), Err(FormError::CdoaNotFound(_))));
    }

    #[test]
    fn pending_state_has_no_table() {
        assert!(LookupState::default().table().is_none());
        assert!(!LookupState::Pending.is_loaded());
    }
}
