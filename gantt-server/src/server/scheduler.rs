//! One-shot reminder jobs.
//!
//! A single driver task owns the in-memory job table (reminder id -> deadline)
//! and sleeps until the earliest deadline. The table is only a cache of the
//! `task_reminders` rows: [`ReminderScheduler::start`] rebuilds it from storage,
//! and firing re-reads and claims the row before anything is delivered.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use gantt_shared::api::ReminderPayload;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::storage::{StorageError, Store};

use super::config::ReminderConfig;
use super::push::PushService;

/// Upper bound for a single sleep of the driver; far deadlines are approached
/// in steps.
const MAX_NAP: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("reminder scheduler is not running")]
    Unavailable,
    #[error("reminder scheduler already started")]
    AlreadyStarted,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// The reminder was claimed and marked sent; `delivered` of `subscriptions`
    /// pushes succeeded.
    Sent { subscriptions: usize, delivered: usize },
    /// Missing or already sent.
    Skipped,
    /// Still pending with a later `remind_at`; the job has to be re-armed.
    NotDue(NaiveDateTime),
}

#[derive(Debug)]
enum Command {
    Schedule { id: i32, at: NaiveDateTime },
    Cancel { id: i32 },
}

#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    dispatcher: Dispatcher,
    tx: mpsc::UnboundedSender<Command>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

#[derive(Clone)]
struct Dispatcher {
    store: Store,
    push: Option<PushService>,
    reminders: ReminderConfig,
}

impl ReminderScheduler {
    pub fn new(store: Store, push: Option<PushService>, reminders: ReminderConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                dispatcher: Dispatcher {
                    store,
                    push,
                    reminders,
                },
                tx,
                rx: Mutex::new(Some(rx)),
                driver: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Spawns the driver and re-arms every pending reminder whose `remind_at`
    /// is still ahead. Overdue pending reminders are reported, not fired.
    /// Returns the number of jobs armed.
    pub async fn start(&self) -> Result<usize, SchedulerError> {
        let rx = self
            .inner
            .rx
            .lock()
            .await
            .take()
            .ok_or(SchedulerError::AlreadyStarted)?;
        let handle = tokio::spawn(drive(
            rx,
            self.inner.tx.clone(),
            self.inner.dispatcher.clone(),
            self.inner.shutdown.clone(),
        ));
        *self.inner.driver.lock().await = Some(handle);

        let pending = self.inner.dispatcher.store.pending_reminders().await?;
        let now = Utc::now().naive_utc();
        let mut armed = 0usize;
        let mut overdue = 0usize;
        for r in pending {
            if r.remind_at > now {
                self.schedule(r.id, r.remind_at)?;
                armed += 1;
            } else {
                overdue += 1;
            }
        }
        if overdue > 0 {
            warn!(overdue, "scheduler: pending reminders already past due; not firing");
        }
        info!(armed, "scheduler: started");
        Ok(armed)
    }

    /// Stops the driver. Jobs still in the table are dropped; their rows stay
    /// pending and are picked up by the next `start`.
    pub async fn stop(&self) {
        self.inner.shutdown.cancel();
        let handle = self.inner.driver.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "scheduler: driver task join error");
        }
        info!("scheduler: stopped");
    }

    /// Fails with [`SchedulerError::Unavailable`] once the driver was stopped.
    pub fn ensure_running(&self) -> Result<(), SchedulerError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(SchedulerError::Unavailable);
        }
        Ok(())
    }

    /// Arms (or re-arms) the job for `id`; any previous deadline is replaced.
    pub fn schedule(&self, id: i32, at: NaiveDateTime) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        self.inner
            .tx
            .send(Command::Schedule { id, at })
            .map_err(|_| SchedulerError::Unavailable)
    }

    /// Removes the job for `id`. Cancelling an unknown id is not an error.
    pub fn cancel(&self, id: i32) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        self.inner
            .tx
            .send(Command::Cancel { id })
            .map_err(|_| SchedulerError::Unavailable)
    }

    /// Runs the delivery step for `id` right now. Safe to call repeatedly:
    /// only the call that claims the row delivers anything.
    pub async fn fire(&self, id: i32) -> Result<FireOutcome, SchedulerError> {
        self.inner.dispatcher.fire(id).await
    }
}

fn deadline_for(at: NaiveDateTime) -> Instant {
    let wait = (at - Utc::now().naive_utc())
        .to_std()
        .unwrap_or(Duration::ZERO);
    Instant::now() + wait
}

async fn drive(
    mut rx: mpsc::UnboundedReceiver<Command>,
    tx: mpsc::UnboundedSender<Command>,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) {
    let mut jobs: HashMap<i32, Instant> = HashMap::new();
    loop {
        let next = jobs
            .iter()
            .min_by_key(|(_, deadline)| **deadline)
            .map(|(id, deadline)| (*id, *deadline));
        let wake = next.map(|(_, deadline)| deadline.min(Instant::now() + MAX_NAP));

        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(jobs = jobs.len(), "scheduler: shutdown requested");
                break;
            }

            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    info!("scheduler: command channel closed; exiting");
                    break;
                };
                match cmd {
                    Command::Schedule { id, at } => {
                        debug!(reminder_id = id, remind_at = %at, "scheduler: job scheduled");
                        jobs.insert(id, deadline_for(at));
                    }
                    Command::Cancel { id } => {
                        if jobs.remove(&id).is_some() {
                            debug!(reminder_id = id, "scheduler: job cancelled");
                        }
                    }
                }
            }

            _ = tokio::time::sleep_until(wake.unwrap_or_else(Instant::now)), if wake.is_some() => {
                let Some((id, deadline)) = next else { continue };
                if deadline > Instant::now() {
                    continue;
                }
                jobs.remove(&id);
                let dispatcher = dispatcher.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    match dispatcher.fire(id).await {
                        Ok(FireOutcome::NotDue(at)) => {
                            debug!(reminder_id = id, remind_at = %at, "scheduler: woke early; re-arming");
                            let _ = tx.send(Command::Schedule { id, at });
                        }
                        Ok(_) => {}
                        Err(e) => warn!(reminder_id = id, error = %e, "scheduler: firing failed"),
                    }
                });
            }
        }
    }
}

impl Dispatcher {
    async fn fire(&self, id: i32) -> Result<FireOutcome, SchedulerError> {
        // Reads that can fail happen before the claim; a claimed reminder is never retried.
        let Some(current) = self.store.get_reminder(id).await? else {
            debug!(reminder_id = id, "scheduler: reminder gone");
            return Ok(FireOutcome::Skipped);
        };
        let task_name = self
            .store
            .task_name(current.task_id)
            .await?
            .unwrap_or_else(|| format!("task #{}", current.task_id));
        let subscriptions = match &self.push {
            Some(push) => Some(push.subscriptions(current.user_id).await?),
            None => None,
        };

        let now = Utc::now().naive_utc();
        let Some(reminder) = self.store.claim_due_reminder(id, now).await? else {
            return match self.store.get_reminder(id).await? {
                Some(r) if !r.sent && r.remind_at > now => Ok(FireOutcome::NotDue(r.remind_at)),
                _ => {
                    debug!(reminder_id = id, "scheduler: reminder gone or already sent");
                    Ok(FireOutcome::Skipped)
                }
            };
        };

        let body = self
            .reminders
            .render_body(reminder.task_id, &task_name)
            .unwrap_or_else(|e| {
                warn!(reminder_id = id, error = %e, "scheduler: body template failed");
                task_name.clone()
            });
        let payload = ReminderPayload {
            title: self.reminders.title.clone(),
            body,
            task_id: reminder.task_id,
            reminder_id: reminder.id,
        };

        let (Some(push), Some(subs)) = (&self.push, subscriptions) else {
            info!(
                reminder_id = id,
                user_id = reminder.user_id,
                "scheduler: push disabled; reminder marked sent without delivery"
            );
            return Ok(FireOutcome::Sent {
                subscriptions: 0,
                delivered: 0,
            });
        };

        let report = push.deliver(reminder.user_id, &subs, &payload).await;
        if report.subscriptions > 0 && report.delivered == 0 {
            error!(
                reminder_id = id,
                user_id = reminder.user_id,
                "scheduler: reminder claimed but every delivery failed"
            );
        }
        info!(
            reminder_id = id,
            user_id = reminder.user_id,
            subscriptions = report.subscriptions,
            delivered = report.delivered,
            "scheduler: reminder fired"
        );
        Ok(FireOutcome::Sent {
            subscriptions: report.subscriptions,
            delivered: report.delivered,
        })
    }
}
