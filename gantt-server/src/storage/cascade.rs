//! Subtree deletes for the ownership hierarchy.
//!
//! These helpers do not open their own transaction: callers run them inside
//! the IMMEDIATE transaction that also holds the permission check, so a failure
//! at any depth rolls the whole subtree back. Reminders are keyed by task id
//! without a foreign key and are left in place.

use diesel::prelude::*;

use super::StorageError;
use super::schema::{
    goals, memberships, projects, streams, task_assignees, task_relations, tasks, teams,
};

fn delete_task_links(conn: &mut SqliteConnection, task_ids: &[i32]) -> Result<(), StorageError> {
    if task_ids.is_empty() {
        return Ok(());
    }
    diesel::delete(task_assignees::table.filter(task_assignees::task_id.eq_any(task_ids)))
        .execute(conn)?;
    diesel::delete(
        task_relations::table.filter(
            task_relations::task_id_1
                .eq_any(task_ids)
                .or(task_relations::task_id_2.eq_any(task_ids)),
        ),
    )
    .execute(conn)?;
    Ok(())
}

pub fn delete_task_subtree(conn: &mut SqliteConnection, task_id: i32) -> Result<(), StorageError> {
    delete_task_links(conn, &[task_id])?;
    diesel::delete(tasks::table.filter(tasks::id.eq(task_id))).execute(conn)?;
    Ok(())
}

pub fn delete_stream_subtree(
    conn: &mut SqliteConnection,
    stream_id: i32,
) -> Result<(), StorageError> {
    let task_ids: Vec<i32> = tasks::table
        .filter(tasks::stream_id.eq(stream_id))
        .select(tasks::id)
        .load(conn)?;
    delete_task_links(conn, &task_ids)?;
    diesel::delete(tasks::table.filter(tasks::stream_id.eq(stream_id))).execute(conn)?;
    diesel::delete(goals::table.filter(goals::stream_id.eq(stream_id))).execute(conn)?;
    diesel::delete(streams::table.filter(streams::id.eq(stream_id))).execute(conn)?;
    Ok(())
}

pub fn delete_project_subtree(
    conn: &mut SqliteConnection,
    project_id: i32,
) -> Result<(), StorageError> {
    let stream_ids: Vec<i32> = streams::table
        .filter(streams::project_id.eq(project_id))
        .select(streams::id)
        .load(conn)?;
    for sid in stream_ids {
        delete_stream_subtree(conn, sid)?;
    }
    diesel::delete(projects::table.filter(projects::id.eq(project_id))).execute(conn)?;
    Ok(())
}

pub fn delete_team_subtree(conn: &mut SqliteConnection, team_id: i32) -> Result<(), StorageError> {
    let project_ids: Vec<i32> = projects::table
        .filter(projects::team_id.eq(team_id))
        .select(projects::id)
        .load(conn)?;
    for pid in project_ids {
        delete_project_subtree(conn, pid)?;
    }
    diesel::delete(memberships::table.filter(memberships::team_id.eq(team_id))).execute(conn)?;
    diesel::delete(teams::table.filter(teams::id.eq(team_id))).execute(conn)?;
    Ok(())
}
