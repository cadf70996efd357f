//! Full-sync diffing
//!
//! Partitions a remote snapshot against the local set by PMS id:
//!
//! - **to_create**: remote ids absent locally
//! - **to_update**: ids present on both sides (overwritten unconditionally,
//!   the PMS always wins)
//! - **to_delete**: local ids the PMS no longer reports

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::models::{PmsReservation, Reservation};

/// The writes a full sync will apply
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub to_create: Vec<PmsReservation>,
    /// Remote record paired with the local record it replaces
    pub to_update: Vec<(PmsReservation, Reservation)>,
    pub to_delete: Vec<Reservation>,
}

impl SyncPlan {
    /// Total number of writes
    pub fn change_count(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }
}

/// Compute the create/update/delete partitions for a full sync
///
/// If the snapshot lists a PMS id more than once, the last occurrence wins.
/// Output order follows the input order on each side.
pub fn plan_full_sync(remote: Vec<PmsReservation>, local: Vec<Reservation>) -> SyncPlan {
    let remote = dedupe_remote(remote);
    let remote_ids: HashSet<String> = remote.iter().map(|r| key(&r.pms_id)).collect();

    let mut local_by_id: HashMap<String, Reservation> = HashMap::with_capacity(local.len());
    let mut to_delete = Vec::new();
    for reservation in local {
        if remote_ids.contains(&reservation.pms_id) {
            local_by_id.insert(reservation.pms_id.clone(), reservation);
        } else {
            to_delete.push(reservation);
        }
    }

    let mut to_create = Vec::new();
    let mut to_update = Vec::new();
    for reservation in remote {
        match local_by_id.remove(&key(&reservation.pms_id)) {
            Some(existing) => to_update.push((reservation, existing)),
            None => to_create.push(reservation),
        }
    }

    SyncPlan {
        to_create,
        to_update,
        to_delete,
    }
}

/// Local ids are stored trimmed; compare remote ids the same way
fn key(pms_id: &str) -> String {
    pms_id.trim().to_string()
}

fn dedupe_remote(remote: Vec<PmsReservation>) -> Vec<PmsReservation> {
    let mut position: HashMap<String, usize> = HashMap::with_capacity(remote.len());
    let mut unique: Vec<PmsReservation> = Vec::with_capacity(remote.len());

    for reservation in remote {
        let id = key(&reservation.pms_id);
        match position.get(&id) {
            Some(&index) => {
                warn!("PMS snapshot lists reservation {} more than once", id);
                unique[index] = reservation;
            }
            None => {
                position.insert(id, unique.len());
                unique.push(reservation);
            }
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{local_reservation, pms_reservation};

    fn ids<'a>(iter: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
        iter.collect()
    }

    #[test]
    fn test_partitions_by_pms_id() {
        let remote = vec![pms_reservation("A", "Ann"), pms_reservation("B", "Ben")];
        let local = vec![local_reservation("B", "Old Ben"), local_reservation("C", "Cat")];

        let plan = plan_full_sync(remote, local);

        assert_eq!(ids(plan.to_create.iter().map(|r| r.pms_id.as_str())), vec!["A"]);
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update[0].0.guest_name, "Ben");
        assert_eq!(plan.to_update[0].1.guest_name, "Old Ben");
        assert_eq!(ids(plan.to_delete.iter().map(|r| r.pms_id.as_str())), vec!["C"]);
        assert_eq!(plan.change_count(), 3);
    }

    #[test]
    fn test_empty_remote_deletes_everything() {
        let local = vec![local_reservation("A", "a"), local_reservation("B", "b")];
        let plan = plan_full_sync(Vec::new(), local);

        assert!(plan.to_create.is_empty());
        assert!(plan.to_update.is_empty());
        assert_eq!(plan.to_delete.len(), 2);
    }

    #[test]
    fn test_empty_local_creates_everything() {
        let remote = vec![pms_reservation("A", "a"), pms_reservation("B", "b")];
        let plan = plan_full_sync(remote, Vec::new());

        assert_eq!(plan.to_create.len(), 2);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_both_empty() {
        assert!(plan_full_sync(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn test_duplicate_remote_ids_last_wins() {
        let remote = vec![
            pms_reservation("A", "first"),
            pms_reservation("B", "b"),
            pms_reservation("A", "second"),
        ];

        let plan = plan_full_sync(remote, Vec::new());

        assert_eq!(plan.to_create.len(), 2);
        assert_eq!(plan.to_create[0].pms_id, "A");
        assert_eq!(plan.to_create[0].guest_name, "second");
    }

    #[test]
    fn test_remote_ids_are_trimmed_before_matching() {
        let remote = vec![pms_reservation(" A ", "Ann")];
        let local = vec![local_reservation("A", "Ann")];

        let plan = plan_full_sync(remote, local);

        assert!(plan.to_create.is_empty());
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.to_update.len(), 1);
    }
}
