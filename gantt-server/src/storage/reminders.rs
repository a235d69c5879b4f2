use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use gantt_shared::auth::Role;

use super::access::{self, ResourceRef};
use super::models::{NewTaskReminder, TaskReminder};
use super::schema::{task_reminders, tasks};
use super::{Store, StorageError};

const PAST_REMINDER: &str = "remind_at must be in the future";

/// Clock skew tolerated between the timer wheel and the wall clock when
/// claiming a due reminder.
const CLAIM_GRACE_MS: i64 = 1_000;

fn load_owned(
    conn: &mut SqliteConnection,
    actor: i32,
    reminder_id: i32,
) -> Result<TaskReminder, StorageError> {
    let reminder = task_reminders::table
        .filter(task_reminders::id.eq(reminder_id))
        .select(TaskReminder::as_select())
        .first::<TaskReminder>(conn)
        .optional()?
        .ok_or_else(|| StorageError::not_found("reminder not found"))?;
    if reminder.user_id != actor {
        return Err(StorageError::forbidden("no access to this reminder"));
    }
    Ok(reminder)
}

impl Store {
    /// Any member who can read the task may set a personal reminder on it.
    pub async fn create_reminder(
        &self,
        actor: i32,
        task_id: i32,
        remind_at: NaiveDateTime,
    ) -> Result<TaskReminder, StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Task(task_id), Role::Reader)?;
            if remind_at <= Utc::now().naive_utc() {
                return Err(StorageError::conflict(PAST_REMINDER));
            }
            Ok(diesel::insert_into(task_reminders::table)
                .values(&NewTaskReminder {
                    task_id,
                    user_id: actor,
                    remind_at,
                })
                .returning(TaskReminder::as_returning())
                .get_result::<TaskReminder>(conn)?)
        })
        .await
    }

    /// Owner-only. A new `remind_at` also returns the reminder to pending.
    pub async fn update_reminder(
        &self,
        actor: i32,
        reminder_id: i32,
        remind_at: Option<NaiveDateTime>,
    ) -> Result<TaskReminder, StorageError> {
        self.write_tx(move |conn| {
            let current = load_owned(conn, actor, reminder_id)?;
            let Some(at) = remind_at else {
                return Ok(current);
            };
            if at <= Utc::now().naive_utc() {
                return Err(StorageError::conflict(PAST_REMINDER));
            }
            Ok(
                diesel::update(task_reminders::table.filter(task_reminders::id.eq(reminder_id)))
                    .set((
                        task_reminders::remind_at.eq(at),
                        task_reminders::sent.eq(false),
                    ))
                    .returning(TaskReminder::as_returning())
                    .get_result::<TaskReminder>(conn)?,
            )
        })
        .await
    }

    pub async fn delete_reminder(&self, actor: i32, reminder_id: i32) -> Result<(), StorageError> {
        self.write_tx(move |conn| {
            load_owned(conn, actor, reminder_id)?;
            diesel::delete(task_reminders::table.filter(task_reminders::id.eq(reminder_id)))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    /// Unchecked removal, used to undo an insert whose job could not be scheduled.
    pub async fn discard_reminder(&self, reminder_id: i32) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            diesel::delete(task_reminders::table.filter(task_reminders::id.eq(reminder_id)))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    /// The actor's own reminders on a task it can read.
    pub async fn list_task_reminders(
        &self,
        actor: i32,
        task_id: i32,
    ) -> Result<Vec<TaskReminder>, StorageError> {
        self.with_conn(move |conn| {
            access::resolve(conn, actor, ResourceRef::Task(task_id), Role::Reader)?;
            Ok(task_reminders::table
                .filter(task_reminders::task_id.eq(task_id))
                .filter(task_reminders::user_id.eq(actor))
                .order((task_reminders::remind_at.asc(), task_reminders::id.asc()))
                .select(TaskReminder::as_select())
                .load::<TaskReminder>(conn)?)
        })
        .await
    }

    pub async fn list_user_reminders(&self, actor: i32) -> Result<Vec<TaskReminder>, StorageError> {
        self.with_conn(move |conn| {
            Ok(task_reminders::table
                .filter(task_reminders::user_id.eq(actor))
                .order((task_reminders::remind_at.asc(), task_reminders::id.asc()))
                .select(TaskReminder::as_select())
                .load::<TaskReminder>(conn)?)
        })
        .await
    }

    pub async fn get_reminder(&self, reminder_id: i32) -> Result<Option<TaskReminder>, StorageError> {
        self.with_conn(move |conn| {
            Ok(task_reminders::table
                .filter(task_reminders::id.eq(reminder_id))
                .select(TaskReminder::as_select())
                .first::<TaskReminder>(conn)
                .optional()?)
        })
        .await
    }

    pub async fn pending_reminders(&self) -> Result<Vec<TaskReminder>, StorageError> {
        self.with_conn(move |conn| {
            Ok(task_reminders::table
                .filter(task_reminders::sent.eq(false))
                .order(task_reminders::remind_at.asc())
                .select(TaskReminder::as_select())
                .load::<TaskReminder>(conn)?)
        })
        .await
    }

    /// Atomically flips a due, unsent reminder to sent and returns it.
    ///
    /// `None` means the reminder is gone, already sent, or not due yet; the
    /// caller must not deliver anything in that case.
    pub async fn claim_due_reminder(
        &self,
        reminder_id: i32,
        now: NaiveDateTime,
    ) -> Result<Option<TaskReminder>, StorageError> {
        let cutoff = now + Duration::milliseconds(CLAIM_GRACE_MS);
        self.write_tx(move |conn| {
            Ok(diesel::update(
                task_reminders::table
                    .filter(task_reminders::id.eq(reminder_id))
                    .filter(task_reminders::sent.eq(false))
                    .filter(task_reminders::remind_at.le(cutoff)),
            )
            .set(task_reminders::sent.eq(true))
            .returning(TaskReminder::as_returning())
            .get_result::<TaskReminder>(conn)
            .optional()?)
        })
        .await
    }

    /// Name of the task, if it still exists.
    pub async fn task_name(&self, task_id: i32) -> Result<Option<String>, StorageError> {
        self.with_conn(move |conn| {
            Ok(tasks::table
                .filter(tasks::id.eq(task_id))
                .select(tasks::name)
                .first::<String>(conn)
                .optional()?)
        })
        .await
    }
}
