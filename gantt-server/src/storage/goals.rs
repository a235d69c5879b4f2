use chrono::NaiveDateTime;
use diesel::prelude::*;
use gantt_shared::auth::Role;

use super::access::{self, ResourceRef};
use super::models::{Goal, GoalChanges, NewGoal};
use super::schema::goals;
use super::{Store, StorageError};

const DUPLICATE: &str = "goal with this name already exists in the stream";

#[derive(Debug, Clone, Default)]
pub struct GoalInput {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct GoalPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDateTime>>,
    pub deadline: Option<Option<NaiveDateTime>>,
    pub position: Option<i32>,
}

fn ensure_unique_name(
    conn: &mut SqliteConnection,
    stream_id: i32,
    name: &str,
    exclude: Option<i32>,
) -> Result<(), StorageError> {
    let mut query = goals::table
        .filter(goals::stream_id.eq(stream_id))
        .filter(goals::name.eq(name))
        .into_boxed();
    if let Some(id) = exclude {
        query = query.filter(goals::id.ne(id));
    }
    let count: i64 = query.count().get_result(conn)?;
    if count > 0 {
        return Err(StorageError::conflict(DUPLICATE));
    }
    Ok(())
}

fn next_position(conn: &mut SqliteConnection, stream_id: i32) -> Result<i32, StorageError> {
    let max: Option<i32> = goals::table
        .filter(goals::stream_id.eq(stream_id))
        .select(diesel::dsl::max(goals::position))
        .first(conn)?;
    Ok(max.map_or(1, |p| p + 1))
}

fn load_goal(conn: &mut SqliteConnection, goal_id: i32) -> Result<Goal, StorageError> {
    Ok(goals::table
        .filter(goals::id.eq(goal_id))
        .select(Goal::as_select())
        .first::<Goal>(conn)?)
}

impl Store {
    pub async fn list_goals(&self, actor: i32, stream_id: i32) -> Result<Vec<Goal>, StorageError> {
        self.with_conn(move |conn| {
            access::resolve(conn, actor, ResourceRef::Stream(stream_id), Role::Reader)?;
            Ok(goals::table
                .filter(goals::stream_id.eq(stream_id))
                .order((goals::position.asc(), goals::id.asc()))
                .select(Goal::as_select())
                .load::<Goal>(conn)?)
        })
        .await
    }

    pub async fn create_goal(
        &self,
        actor: i32,
        stream_id: i32,
        input: GoalInput,
    ) -> Result<Goal, StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Stream(stream_id), Role::Editor)?;
            ensure_unique_name(conn, stream_id, &input.name, None)?;
            let position = match input.position {
                Some(p) => p,
                None => next_position(conn, stream_id)?,
            };
            Ok(diesel::insert_into(goals::table)
                .values(&NewGoal {
                    stream_id,
                    name: &input.name,
                    description: input.description.as_deref(),
                    start_date: input.start_date,
                    deadline: input.deadline,
                    position,
                })
                .returning(Goal::as_returning())
                .get_result::<Goal>(conn)?)
        })
        .await
        .map_err(|e| e.unique_as_conflict(DUPLICATE))
    }

    pub async fn update_goal(
        &self,
        actor: i32,
        goal_id: i32,
        patch: GoalPatch,
    ) -> Result<Goal, StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Goal(goal_id), Role::Editor)?;
            let current = load_goal(conn, goal_id)?;
            // Renaming to the current name is not a rename
            let name = patch.name.filter(|n| *n != current.name);
            if let Some(name) = &name {
                ensure_unique_name(conn, current.stream_id, name, Some(goal_id))?;
            }
            let changes = GoalChanges {
                name,
                description: patch.description,
                start_date: patch.start_date,
                deadline: patch.deadline,
                position: patch.position,
            };
            if changes.is_empty() {
                return Ok(current);
            }
            Ok(diesel::update(goals::table.filter(goals::id.eq(goal_id)))
                .set(&changes)
                .returning(Goal::as_returning())
                .get_result::<Goal>(conn)?)
        })
        .await
        .map_err(|e| e.unique_as_conflict(DUPLICATE))
    }

    pub async fn delete_goal(&self, actor: i32, goal_id: i32) -> Result<(), StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Goal(goal_id), Role::Editor)?;
            diesel::delete(goals::table.filter(goals::id.eq(goal_id))).execute(conn)?;
            Ok(())
        })
        .await
    }
}
