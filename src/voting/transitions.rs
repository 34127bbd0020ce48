use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rocket::{
    fairing::{Fairing, Info, Kind},
    futures::future::{BoxFuture, FutureExt},
    tokio::sync::Mutex,
    Build, Rocket,
};

use crate::{
    config::Config,
    error::Result,
    model::{db::election::Election, mongodb::Id},
    scheduled_task::ScheduledTask,
    store::SharedStore,
};

use super::clock;

/// Map from election IDs to their pending clock evaluation.
type TaskMap = HashMap<Id, ScheduledTask<Result<()>>>;

/// Seconds before an evaluation that hit a storage error is retried.
const RETRY_INTERVAL_SECONDS: i64 = 300;

/// Scheduled clock evaluations: one pending task per election that can still
/// change status, due at its next window boundary. Each task reschedules
/// itself until the election reaches a terminal status.
pub struct ElectionTransitions {
    store: SharedStore,
    enabled: bool,
    tasks: Arc<Mutex<TaskMap>>,
}

impl ElectionTransitions {
    /// Create an empty schedule. A disabled schedule never runs anything;
    /// status then only changes through sweeps and manual transitions.
    pub fn new(store: SharedStore, enabled: bool) -> Self {
        Self {
            store,
            enabled,
            tasks: Default::default(),
        }
    }

    /// Is an evaluation pending for the given election?
    #[cfg(test)]
    pub async fn is_scheduled(&self, election_id: Id) -> bool {
        self.tasks.lock().await.contains_key(&election_id)
    }

    /// Schedule an evaluation for every election that can still change.
    pub async fn schedule_elections(&self) -> Result<()> {
        let now = Utc::now();
        for election in self.store.elections().await? {
            if clock::next_boundary(&election, now).is_some() {
                self.schedule_election(&election).await;
            }
        }
        Ok(())
    }

    /// Schedule the next evaluation for the given election, replacing any
    /// pending one. Does nothing if the election can no longer change.
    pub async fn schedule_election(&self, election: &Election) {
        if !self.enabled {
            return;
        }
        let mut tasks_locked = self.tasks.lock().await;
        if let Some(task) = tasks_locked.remove(&election.id) {
            if task.cancel().await {
                // Tasks remove or replace their own entry before finishing.
                warn!(
                    "Evaluation for election {} finished while being rescheduled",
                    election.id
                );
            }
        }
        if let Some(run_at) = clock::next_boundary(election, Utc::now()) {
            let task = Self::transition(election.id, self.store.clone(), self.tasks.clone());
            tasks_locked.insert(election.id, ScheduledTask::new(task, run_at));
            debug!("Scheduled clock evaluation for election {} at {run_at}", election.id);
        }
    }

    /// Evaluate the election's clock, then schedule the next evaluation.
    /// Since this is a recursive async function, we must use `BoxFuture` to
    /// avoid an infinitely-recursive state machine.
    fn transition(
        election_id: Id,
        store: SharedStore,
        tasks: Arc<Mutex<TaskMap>>,
    ) -> BoxFuture<'static, Result<()>> {
        /// Nested function for error handling.
        async fn evaluate(store: &SharedStore, election_id: Id) -> Result<Option<Election>> {
            let mut election = match store.election(election_id).await? {
                Some(election) => election,
                None => return Ok(None),
            };
            clock::evaluate(store.as_ref(), &mut election, Utc::now()).await?;
            Ok(Some(election))
        }

        async move {
            let result = evaluate(&store, election_id).await;
            let next = match result {
                Ok(Some(ref election)) => clock::next_boundary(election, Utc::now()),
                Ok(None) => {
                    warn!("Scheduled election {election_id} no longer exists");
                    None
                }
                Err(ref e) => {
                    error!("Clock evaluation for election {election_id} failed: {e}");
                    warn!("Failed evaluation will be retried in {RETRY_INTERVAL_SECONDS} seconds");
                    Some(Utc::now() + Duration::seconds(RETRY_INTERVAL_SECONDS))
                }
            };

            let mut tasks_locked = tasks.lock().await;
            match next {
                Some(run_at) => {
                    let task = Self::transition(election_id, store, tasks.clone());
                    tasks_locked.insert(election_id, ScheduledTask::new(task, run_at));
                    trace!("Rescheduled election {election_id} for {run_at}");
                }
                None => {
                    tasks_locked.remove(&election_id);
                    trace!("Election {election_id} reached a final status; removed from schedule");
                }
            }
            result.map(|_| ())
        }
        .boxed()
    }
}

/// A fairing that places an `ElectionTransitions` into managed state and, if
/// enabled in config, schedules every election that can still change status.
/// Depends on the config and the store being in managed state, so must be
/// attached after the fairings responsible for those.
pub struct ClockFairing;

#[rocket::async_trait]
impl Fairing for ClockFairing {
    fn info(&self) -> Info {
        Info {
            name: "Election Clock",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let enabled = match rocket.state::<Config>() {
            Some(config) => config.schedule_transitions(),
            None => {
                error!("Config was not available when scheduling election transitions");
                return Err(rocket);
            }
        };
        let store = match rocket.state::<SharedStore>() {
            Some(store) => store.clone(),
            None => {
                error!("Store was not available when scheduling election transitions");
                return Err(rocket);
            }
        };

        let transitions = ElectionTransitions::new(store, enabled);
        if enabled {
            info!("Scheduling election transitions...");
            if let Err(e) = transitions.schedule_elections().await {
                error!("Failed to schedule election transitions: {e}");
                return Err(rocket);
            }
            info!("...election transitions scheduled!");
        }

        rocket = rocket.manage(transitions);
        Ok(rocket)
    }
}
