//! In-memory mission collection with optimistic updates
//!
//! A change is applied locally first and handed back as an
//! [`OptimisticToken`]. The caller then settles it with [`MissionStore::commit`]
//! or [`MissionStore::rollback`]. A mission with a change in flight refuses a
//! second one until the first settles.

use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{DeskError, DeskResult};
use crate::gateway::{Gateway, GatewayResult};
use crate::models::Mission;

/// Handle for one pending optimistic change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptimisticToken(Uuid);

/// A local change to one mission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionPatch {
    Completed(bool),
}

impl MissionPatch {
    fn apply(self, mission: &mut Mission) -> MissionPatch {
        match self {
            MissionPatch::Completed(value) => {
                let previous = MissionPatch::Completed(mission.completed);
                mission.completed = value;
                previous
            }
        }
    }

    fn agrees_with(self, mission: &Mission) -> bool {
        match self {
            MissionPatch::Completed(value) => mission.completed == value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingChange {
    mission_id: u64,
    applied: MissionPatch,
    previous: MissionPatch,
}

/// How an optimistic change ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Committed,
    /// The view was torn down before the server answered
    Abandoned,
}

pub struct MissionStore {
    missions: Vec<Mission>,
    pending: HashMap<OptimisticToken, PendingChange>,
    cancel: CancellationToken,
}

impl Default for MissionStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Drop for MissionStore {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl MissionStore {
    pub fn new(missions: Vec<Mission>) -> Self {
        Self {
            missions,
            pending: HashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    pub fn get(&self, id: u64) -> Option<&Mission> {
        self.missions.iter().find(|m| m.id == id)
    }

    fn get_mut(&mut self, id: u64) -> DeskResult<&mut Mission> {
        self.missions
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(DeskError::UnknownMission(id))
    }

    /// Token cancelled by [`MissionStore::teardown`]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abandons anything still in flight; late answers are ignored from now on.
    ///
    /// Also runs when the store is dropped, so watchers holding
    /// [`MissionStore::cancellation`] see the view close.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Replaces the collection with the server's listing.
    ///
    /// Changes still in flight are re-applied on top of the fresh records.
    /// Returns `false` when the store was torn down before the listing arrived.
    pub async fn refresh(&mut self, gateway: &dyn Gateway) -> DeskResult<bool> {
        let cancel = self.cancel.clone();
        let listing = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(false),
            listing = gateway.list_missions() => listing?,
        };

        self.missions = listing;
        let in_flight: Vec<PendingChange> = self.pending.values().copied().collect();
        for change in in_flight {
            if let Ok(mission) = self.get_mut(change.mission_id) {
                change.applied.apply(mission);
                mission.is_updating = true;
            }
        }

        tracing::debug!(count = self.missions.len(), "missions loaded");
        Ok(true)
    }

    /// Applies `patch` locally and marks the mission as updating
    pub fn apply_optimistic(&mut self, mission_id: u64, patch: MissionPatch) -> DeskResult<OptimisticToken> {
        let mission = self.get_mut(mission_id)?;
        if mission.is_updating {
            return Err(DeskError::Busy { mission_id });
        }

        let previous = patch.apply(mission);
        mission.is_updating = true;

        let token = OptimisticToken(Uuid::new_v4());
        self.pending.insert(
            token,
            PendingChange {
                mission_id,
                applied: patch,
                previous,
            },
        );

        tracing::debug!(mission_id, ?patch, "optimistic change applied");
        Ok(token)
    }

    /// Confirms a pending change.
    ///
    /// When the server sent its own copy and it disagrees with the change, the
    /// server's copy wins and a [`DeskError::Conflict`] is returned.
    pub fn commit(&mut self, token: OptimisticToken, confirmed: Option<&Mission>) -> DeskResult<()> {
        let change = self.pending.remove(&token).ok_or(DeskError::UnknownToken)?;
        let mission = self.get_mut(change.mission_id)?;

        let Some(server) = confirmed else {
            mission.is_updating = false;
            return Ok(());
        };

        *mission = server.clone();
        mission.is_updating = false;

        if change.applied.agrees_with(server) {
            tracing::debug!(mission_id = change.mission_id, "optimistic change committed");
            Ok(())
        } else {
            tracing::warn!(
                mission_id = change.mission_id,
                completed = server.completed,
                "server disagreed with optimistic change"
            );
            Err(DeskError::Conflict {
                mission_id: change.mission_id,
                server_completed: server.completed,
            })
        }
    }

    /// Restores the value the mission had before the change
    pub fn rollback(&mut self, token: OptimisticToken) -> DeskResult<()> {
        let change = self.pending.remove(&token).ok_or(DeskError::UnknownToken)?;
        let mission = self.get_mut(change.mission_id)?;
        change.previous.apply(mission);
        mission.is_updating = false;

        tracing::info!(mission_id = change.mission_id, "optimistic change rolled back");
        Ok(())
    }

    /// Settles a change with the server's answer.
    ///
    /// Failures roll back and are returned. After teardown the answer is
    /// dropped and the change is quietly undone.
    pub fn settle(
        &mut self,
        token: OptimisticToken,
        answer: GatewayResult<Option<Mission>>,
    ) -> DeskResult<Settlement> {
        if self.is_torn_down() {
            self.rollback(token)?;
            return Ok(Settlement::Abandoned);
        }

        match answer {
            Ok(confirmed) => self.commit(token, confirmed.as_ref()).map(|_| Settlement::Committed),
            Err(err) => {
                self.rollback(token)?;
                Err(err.into())
            }
        }
    }

    /// Flips a mission's completion, locally first, then on the server
    pub async fn toggle_complete(&mut self, gateway: &dyn Gateway, mission_id: u64) -> DeskResult<Settlement> {
        let completed = self
            .get(mission_id)
            .ok_or(DeskError::UnknownMission(mission_id))?
            .completed;
        let token = self.apply_optimistic(mission_id, MissionPatch::Completed(!completed))?;

        let cancel = self.cancel.clone();
        let answer = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            answer = gateway.toggle_complete(mission_id) => Some(answer),
        };

        match answer {
            Some(answer) => self.settle(token, answer),
            None => {
                self.rollback(token)?;
                Ok(Settlement::Abandoned)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::fake::FakeGateway;
    use crate::models::fixtures::mission;
    use std::sync::atomic::Ordering;

    fn store_with(ids: &[u64]) -> MissionStore {
        MissionStore::new(
            ids.iter()
                .map(|id| mission(*id, "2024-01-01", "2024-01-05", false))
                .collect(),
        )
    }

    #[test]
    fn apply_is_immediate_and_rollback_restores() {
        let mut store = store_with(&[1]);

        let token = store.apply_optimistic(1, MissionPatch::Completed(true)).unwrap();
        let m = store.get(1).unwrap();
        assert!(m.completed);
        assert!(m.is_updating);

        store.rollback(token).unwrap();
        let m = store.get(1).unwrap();
        assert!(!m.completed);
        assert!(!m.is_updating);
    }

    #[test]
    fn second_change_while_updating_is_busy() {
        let mut store = store_with(&[1, 2]);
        let token = store.apply_optimistic(1, MissionPatch::Completed(true)).unwrap();

        let err = store.apply_optimistic(1, MissionPatch::Completed(false)).unwrap_err();
        assert!(matches!(err, DeskError::Busy { mission_id: 1 }));

        // Other missions are independent
        store.apply_optimistic(2, MissionPatch::Completed(true)).unwrap();

        store.commit(token, None).unwrap();
        assert!(store.get(1).unwrap().completed);
        assert!(!store.get(1).unwrap().is_updating);
    }

    #[test]
    fn tokens_settle_once() {
        let mut store = store_with(&[1]);
        let token = store.apply_optimistic(1, MissionPatch::Completed(true)).unwrap();
        store.commit(token, None).unwrap();

        assert!(matches!(store.rollback(token), Err(DeskError::UnknownToken)));
        assert!(matches!(
            store.apply_optimistic(9, MissionPatch::Completed(true)),
            Err(DeskError::UnknownMission(9))
        ));
    }

    #[test]
    fn disagreeing_server_copy_wins() {
        let mut store = store_with(&[1]);
        let token = store.apply_optimistic(1, MissionPatch::Completed(true)).unwrap();

        let server = mission(1, "2024-01-01", "2024-01-05", false);
        let err = store.commit(token, Some(&server)).unwrap_err();
        assert!(matches!(
            err,
            DeskError::Conflict { mission_id: 1, server_completed: false }
        ));

        let m = store.get(1).unwrap();
        assert!(!m.completed);
        assert!(!m.is_updating);
    }

    #[tokio::test]
    async fn toggle_commits_on_success() {
        let gateway = FakeGateway::with_missions(vec![mission(1, "2024-01-01", "2024-01-05", false)]);
        let mut store = MissionStore::default();
        assert!(store.refresh(&gateway).await.unwrap());

        let outcome = store.toggle_complete(&gateway, 1).await.unwrap();
        assert_eq!(outcome, Settlement::Committed);
        assert!(store.get(1).unwrap().completed);
        assert!(!store.get(1).unwrap().is_updating);
    }

    #[tokio::test]
    async fn toggle_rolls_back_on_failure() {
        let gateway = FakeGateway::default();
        gateway.fail_with(503);
        let mut store = store_with(&[1]);

        let err = store.toggle_complete(&gateway, 1).await.unwrap_err();
        assert!(matches!(
            err,
            DeskError::Gateway(GatewayError::Status { status: 503, .. })
        ));

        let m = store.get(1).unwrap();
        assert!(!m.completed);
        assert!(!m.is_updating);
    }

    #[tokio::test]
    async fn toggle_reports_conflict() {
        let gateway = FakeGateway::with_missions(vec![mission(1, "2024-01-01", "2024-01-05", false)]);
        gateway.disagree.store(true, Ordering::SeqCst);
        let mut store = store_with(&[1]);

        let err = store.toggle_complete(&gateway, 1).await.unwrap_err();
        assert!(matches!(err, DeskError::Conflict { .. }));
        assert!(!store.get(1).unwrap().completed);
    }

    #[tokio::test]
    async fn teardown_abandons_in_flight_toggle() {
        let gateway = FakeGateway::with_missions(vec![mission(1, "2024-01-01", "2024-01-05", false)]);
        gateway.hang.store(true, Ordering::SeqCst);
        let mut store = store_with(&[1]);
        store.teardown();

        let outcome = store.toggle_complete(&gateway, 1).await.unwrap();
        assert_eq!(outcome, Settlement::Abandoned);
        assert!(!store.get(1).unwrap().is_updating);

        assert!(!store.refresh(&gateway).await.unwrap());
    }

    #[test]
    fn dropping_store_cancels_watchers() {
        let store = store_with(&[1]);
        let cancel = store.cancellation();
        assert!(!cancel.is_cancelled());

        drop(store);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn late_answer_after_teardown_is_ignored() {
        let mut store = store_with(&[1]);
        let token = store.apply_optimistic(1, MissionPatch::Completed(true)).unwrap();
        store.teardown();

        let answer = Err(GatewayError::Status {
            status: 500,
            body: String::new(),
        });
        assert_eq!(store.settle(token, answer).unwrap(), Settlement::Abandoned);
        assert!(!store.get(1).unwrap().completed);
    }

    #[tokio::test]
    async fn refresh_keeps_in_flight_changes() {
        let gateway = FakeGateway::with_missions(vec![mission(1, "2024-01-01", "2024-01-05", false)]);
        let mut store = store_with(&[1]);
        let token = store.apply_optimistic(1, MissionPatch::Completed(true)).unwrap();

        store.refresh(&gateway).await.unwrap();
        let m = store.get(1).unwrap();
        assert!(m.completed && m.is_updating);

        store.rollback(token).unwrap();
        assert!(!store.get(1).unwrap().completed);
    }
}
