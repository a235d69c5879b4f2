use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use gantt_shared::auth::Role;

use super::access::{self, ResourceRef};
use super::cascade;
use super::models::{NewTask, NewTaskAssignee, NewTaskRelation, Task, TaskChanges, TaskRelation};
use super::schema::{
    connection_types, memberships, priorities, projects, statuses, streams, task_assignees,
    task_relations, tasks, teams, users,
};
use super::{Store, StorageError};

const DEFAULT_STATUS_ID: i32 = 1;
const DEFAULT_PRIORITY_ID: i32 = 1;

#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub name: String,
    pub description: Option<String>,
    pub status_id: Option<i32>,
    pub priority_id: Option<i32>,
    pub assignee_email: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
    pub position: Option<i32>,
}

/// Partial task update. Outer `None` leaves a field alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status_id: Option<Option<i32>>,
    pub priority_id: Option<Option<i32>>,
    pub assignee_email: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDateTime>>,
    pub deadline: Option<Option<NaiveDateTime>>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct RelationView {
    pub relation: TaskRelation,
    pub connection_name: String,
}

#[derive(Debug, Clone)]
pub struct TaskView {
    pub task: Task,
    pub assignee_email: Option<String>,
    /// Outgoing and incoming edges.
    pub relations: Vec<RelationView>,
}

#[derive(Debug, Clone)]
pub struct TaskWithContext {
    pub view: TaskView,
    pub team_id: i32,
    pub team_name: String,
    pub project_name: String,
    pub stream_name: String,
}

fn next_position(conn: &mut SqliteConnection, stream_id: i32) -> Result<i32, StorageError> {
    let max: Option<i32> = tasks::table
        .filter(tasks::stream_id.eq(stream_id))
        .select(diesel::dsl::max(tasks::position))
        .first(conn)?;
    Ok(max.map_or(1, |p| p + 1))
}

fn ensure_status(conn: &mut SqliteConnection, id: i32) -> Result<(), StorageError> {
    let count: i64 = statuses::table
        .filter(statuses::id.eq(id))
        .count()
        .get_result(conn)?;
    if count == 0 {
        return Err(StorageError::not_found("status not found"));
    }
    Ok(())
}

fn ensure_priority(conn: &mut SqliteConnection, id: i32) -> Result<(), StorageError> {
    let count: i64 = priorities::table
        .filter(priorities::id.eq(id))
        .count()
        .get_result(conn)?;
    if count == 0 {
        return Err(StorageError::not_found("priority not found"));
    }
    Ok(())
}

/// Replaces the task's assignee. `None` only removes the current one.
fn set_assignee(
    conn: &mut SqliteConnection,
    task_id: i32,
    email: Option<&str>,
) -> Result<(), StorageError> {
    let user_id = match email {
        Some(email) => Some(
            users::table
                .filter(users::email.eq(email))
                .select(users::id)
                .first::<i32>(conn)
                .optional()?
                .ok_or_else(|| StorageError::not_found(format!("user {email} not found")))?,
        ),
        None => None,
    };
    diesel::delete(task_assignees::table.filter(task_assignees::task_id.eq(task_id)))
        .execute(conn)?;
    if let Some(user_id) = user_id {
        diesel::insert_into(task_assignees::table)
            .values(&NewTaskAssignee { task_id, user_id })
            .execute(conn)?;
    }
    Ok(())
}

fn load_task(conn: &mut SqliteConnection, task_id: i32) -> Result<Task, StorageError> {
    tasks::table
        .filter(tasks::id.eq(task_id))
        .select(Task::as_select())
        .first::<Task>(conn)
        .optional()?
        .ok_or_else(|| StorageError::not_found("task not found"))
}

fn load_views(conn: &mut SqliteConnection, rows: Vec<Task>) -> Result<Vec<TaskView>, StorageError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = rows.iter().map(|t| t.id).collect();

    let assignees: HashMap<i32, String> = task_assignees::table
        .inner_join(users::table)
        .filter(task_assignees::task_id.eq_any(&ids))
        .select((task_assignees::task_id, users::email))
        .load::<(i32, String)>(conn)?
        .into_iter()
        .collect();

    let edges = task_relations::table
        .inner_join(connection_types::table)
        .filter(
            task_relations::task_id_1
                .eq_any(&ids)
                .or(task_relations::task_id_2.eq_any(&ids)),
        )
        .order(task_relations::id.asc())
        .select((TaskRelation::as_select(), connection_types::name))
        .load::<(TaskRelation, String)>(conn)?;

    let mut relations: HashMap<i32, Vec<RelationView>> = HashMap::new();
    for (relation, connection_name) in edges {
        let view = RelationView {
            relation,
            connection_name,
        };
        relations
            .entry(view.relation.task_id_1)
            .or_default()
            .push(view.clone());
        relations
            .entry(view.relation.task_id_2)
            .or_default()
            .push(view);
    }

    Ok(rows
        .into_iter()
        .map(|task| TaskView {
            assignee_email: assignees.get(&task.id).cloned(),
            relations: relations.remove(&task.id).unwrap_or_default(),
            task,
        })
        .collect())
}

fn load_view(conn: &mut SqliteConnection, task_id: i32) -> Result<TaskView, StorageError> {
    let task = load_task(conn, task_id)?;
    let mut views = load_views(conn, vec![task])?;
    views
        .pop()
        .ok_or_else(|| StorageError::not_found("task not found"))
}

impl Store {
    pub async fn list_stream_tasks(
        &self,
        actor: i32,
        stream_id: i32,
    ) -> Result<Vec<TaskView>, StorageError> {
        self.with_conn(move |conn| {
            access::resolve(conn, actor, ResourceRef::Stream(stream_id), Role::Reader)?;
            let rows = tasks::table
                .filter(tasks::stream_id.eq(stream_id))
                .order((tasks::position.asc(), tasks::id.asc()))
                .select(Task::as_select())
                .load::<Task>(conn)?;
            load_views(conn, rows)
        })
        .await
    }

    pub async fn list_project_tasks(
        &self,
        actor: i32,
        project_id: i32,
    ) -> Result<Vec<TaskView>, StorageError> {
        self.with_conn(move |conn| {
            access::resolve(conn, actor, ResourceRef::Project(project_id), Role::Reader)?;
            let rows = tasks::table
                .inner_join(streams::table)
                .filter(streams::project_id.eq(project_id))
                .order((tasks::stream_id.asc(), tasks::position.asc(), tasks::id.asc()))
                .select(Task::as_select())
                .load::<Task>(conn)?;
            load_views(conn, rows)
        })
        .await
    }

    /// Every task in every team the actor belongs to.
    pub async fn list_all_tasks(&self, actor: i32) -> Result<Vec<TaskWithContext>, StorageError> {
        self.with_conn(move |conn| {
            let team_ids: Vec<i32> = memberships::table
                .filter(memberships::user_id.eq(actor))
                .select(memberships::team_id)
                .load(conn)?;
            if team_ids.is_empty() {
                return Ok(Vec::new());
            }
            let rows = tasks::table
                .inner_join(streams::table.inner_join(projects::table.inner_join(teams::table)))
                .filter(projects::team_id.eq_any(&team_ids))
                .order((
                    teams::id.asc(),
                    projects::id.asc(),
                    tasks::stream_id.asc(),
                    tasks::position.asc(),
                    tasks::id.asc(),
                ))
                .select((
                    Task::as_select(),
                    streams::name,
                    projects::name,
                    teams::id,
                    teams::name,
                ))
                .load::<(Task, String, String, i32, String)>(conn)?;

            let mut context = Vec::with_capacity(rows.len());
            let mut task_rows = Vec::with_capacity(rows.len());
            for (task, stream_name, project_name, team_id, team_name) in rows {
                context.push((team_id, team_name, project_name, stream_name));
                task_rows.push(task);
            }
            let views = load_views(conn, task_rows)?;
            Ok(views
                .into_iter()
                .zip(context)
                .map(
                    |(view, (team_id, team_name, project_name, stream_name))| TaskWithContext {
                        view,
                        team_id,
                        team_name,
                        project_name,
                        stream_name,
                    },
                )
                .collect())
        })
        .await
    }

    pub async fn create_task(
        &self,
        actor: i32,
        stream_id: i32,
        input: TaskInput,
    ) -> Result<TaskView, StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Stream(stream_id), Role::Editor)?;
            let status_id = input.status_id.unwrap_or(DEFAULT_STATUS_ID);
            let priority_id = input.priority_id.unwrap_or(DEFAULT_PRIORITY_ID);
            ensure_status(conn, status_id)?;
            ensure_priority(conn, priority_id)?;
            let position = match input.position {
                Some(p) => p,
                None => next_position(conn, stream_id)?,
            };
            let task = diesel::insert_into(tasks::table)
                .values(&NewTask {
                    stream_id,
                    name: &input.name,
                    description: Some(input.description.as_deref().unwrap_or("")),
                    status_id: Some(status_id),
                    priority_id: Some(priority_id),
                    start_date: input.start_date,
                    deadline: input.deadline,
                    position,
                })
                .returning(Task::as_returning())
                .get_result::<Task>(conn)?;
            if let Some(email) = input.assignee_email.as_deref() {
                set_assignee(conn, task.id, Some(email))?;
            }
            load_view(conn, task.id)
        })
        .await
    }

    pub async fn update_task(
        &self,
        actor: i32,
        task_id: i32,
        patch: TaskPatch,
    ) -> Result<TaskView, StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Task(task_id), Role::Editor)?;
            if let Some(Some(id)) = patch.status_id {
                ensure_status(conn, id)?;
            }
            if let Some(Some(id)) = patch.priority_id {
                ensure_priority(conn, id)?;
            }
            let changes = TaskChanges {
                name: patch.name,
                description: patch.description,
                status_id: patch.status_id,
                priority_id: patch.priority_id,
                start_date: patch.start_date,
                deadline: patch.deadline,
                position: patch.position,
            };
            if !changes.is_empty() {
                diesel::update(tasks::table.filter(tasks::id.eq(task_id)))
                    .set(&changes)
                    .execute(conn)?;
            }
            if let Some(assignee) = patch.assignee_email {
                set_assignee(conn, task_id, assignee.as_deref())?;
            }
            load_view(conn, task_id)
        })
        .await
    }

    /// Deletes the task together with its assignment and every relation touching it.
    pub async fn delete_task(&self, actor: i32, task_id: i32) -> Result<(), StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Task(task_id), Role::Editor)?;
            cascade::delete_task_subtree(conn, task_id)
        })
        .await
    }

    /// Permission comes from `task_id_1` alone; `task_id_2` only has to exist.
    pub async fn create_relation(
        &self,
        actor: i32,
        task_id_1: i32,
        task_id_2: i32,
        connection_id: i32,
    ) -> Result<RelationView, StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Task(task_id_1), Role::Editor)?;
            load_task(conn, task_id_2)?;
            if task_id_1 == task_id_2 {
                return Err(StorageError::conflict("task cannot be related to itself"));
            }
            let connection_name = connection_types::table
                .filter(connection_types::id.eq(connection_id))
                .select(connection_types::name)
                .first::<String>(conn)
                .optional()?
                .ok_or_else(|| StorageError::not_found("connection type not found"))?;
            let relation = diesel::insert_into(task_relations::table)
                .values(&NewTaskRelation {
                    task_id_1,
                    task_id_2,
                    connection_id,
                })
                .returning(TaskRelation::as_returning())
                .get_result::<TaskRelation>(conn)?;
            Ok(RelationView {
                relation,
                connection_name,
            })
        })
        .await
    }

    pub async fn delete_relation(&self, actor: i32, relation_id: i32) -> Result<(), StorageError> {
        self.write_tx(move |conn| {
            let task_id_1 = task_relations::table
                .filter(task_relations::id.eq(relation_id))
                .select(task_relations::task_id_1)
                .first::<i32>(conn)
                .optional()?
                .ok_or_else(|| StorageError::not_found("relation not found"))?;
            access::resolve(conn, actor, ResourceRef::Task(task_id_1), Role::Editor)?;
            diesel::delete(task_relations::table.filter(task_relations::id.eq(relation_id)))
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}
