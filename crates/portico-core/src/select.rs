//! Instance selection strategies
//!
//! The resolver picks one instance out of a health-filtered lookup
//! result through this seam. Only first-healthy selection is shipped;
//! round-robin or least-connections would slot in here without touching
//! the resolver.

use crate::record::ServiceRecord;

/// Picks one instance from a non-empty, health-filtered record list.
pub trait InstanceSelector: Send + Sync {
    /// Return the chosen record, or `None` when the list is empty.
    fn select<'a>(&self, records: &'a [ServiceRecord]) -> Option<&'a ServiceRecord>;
}

/// Deterministic first-healthy selection: always the first record the
/// registry returned. A deliberate simplification, not a load balancer.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstHealthy;

impl InstanceSelector for FirstHealthy {
    fn select<'a>(&self, records: &'a [ServiceRecord]) -> Option<&'a ServiceRecord> {
        records.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: &str) -> ServiceRecord {
        ServiceRecord {
            name: "users-service".to_string(),
            address: address.to_string(),
            port: 9001,
            healthy: true,
        }
    }

    #[test]
    fn picks_first_record() {
        let records = vec![record("10.0.0.1"), record("10.0.0.2")];
        let chosen = FirstHealthy.select(&records).unwrap();
        assert_eq!(chosen.address, "10.0.0.1");
    }

    #[test]
    fn empty_list_selects_nothing() {
        assert!(FirstHealthy.select(&[]).is_none());
    }
}
