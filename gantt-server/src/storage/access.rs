//! Ownership-chain permission resolution.
//!
//! Every team-scoped resource climbs Task/Goal -> Stream -> Project -> Team and
//! then looks up the actor's membership in that team. Existence is always
//! checked before membership, so a missing resource is reported as `NotFound`
//! even when the actor would not have had access to it.

use diesel::prelude::*;
use gantt_shared::auth::Role;

use super::StorageError;
use super::models::Membership;
use super::schema::{goals, memberships, projects, streams, tasks, teams};

pub const NO_ACCESS: &str = "no access to this resource";
pub const INSUFFICIENT_ROLE: &str = "insufficient role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    Team(i32),
    Project(i32),
    Stream(i32),
    Task(i32),
    Goal(i32),
}

impl ResourceRef {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceRef::Team(_) => "team",
            ResourceRef::Project(_) => "project",
            ResourceRef::Stream(_) => "stream",
            ResourceRef::Task(_) => "task",
            ResourceRef::Goal(_) => "goal",
        }
    }
}

pub fn team_exists(conn: &mut SqliteConnection, team_id: i32) -> Result<i32, StorageError> {
    teams::table
        .filter(teams::id.eq(team_id))
        .select(teams::id)
        .first::<i32>(conn)
        .optional()?
        .ok_or_else(|| StorageError::not_found("team not found"))
}

pub fn project_team(conn: &mut SqliteConnection, project_id: i32) -> Result<i32, StorageError> {
    let team_id = projects::table
        .filter(projects::id.eq(project_id))
        .select(projects::team_id)
        .first::<i32>(conn)
        .optional()?
        .ok_or_else(|| StorageError::not_found("project not found"))?;
    team_exists(conn, team_id)
}

pub fn stream_team(conn: &mut SqliteConnection, stream_id: i32) -> Result<i32, StorageError> {
    let project_id = streams::table
        .filter(streams::id.eq(stream_id))
        .select(streams::project_id)
        .first::<i32>(conn)
        .optional()?
        .ok_or_else(|| StorageError::not_found("stream not found"))?;
    project_team(conn, project_id)
}

pub fn task_team(conn: &mut SqliteConnection, task_id: i32) -> Result<i32, StorageError> {
    let stream_id = tasks::table
        .filter(tasks::id.eq(task_id))
        .select(tasks::stream_id)
        .first::<i32>(conn)
        .optional()?
        .ok_or_else(|| StorageError::not_found("task not found"))?;
    stream_team(conn, stream_id)
}

pub fn goal_team(conn: &mut SqliteConnection, goal_id: i32) -> Result<i32, StorageError> {
    let stream_id = goals::table
        .filter(goals::id.eq(goal_id))
        .select(goals::stream_id)
        .first::<i32>(conn)
        .optional()?
        .ok_or_else(|| StorageError::not_found("goal not found"))?;
    stream_team(conn, stream_id)
}

/// Owning team of `target`, or `NotFound` for the first missing link.
pub fn owning_team(conn: &mut SqliteConnection, target: ResourceRef) -> Result<i32, StorageError> {
    match target {
        ResourceRef::Team(id) => team_exists(conn, id),
        ResourceRef::Project(id) => project_team(conn, id),
        ResourceRef::Stream(id) => stream_team(conn, id),
        ResourceRef::Task(id) => task_team(conn, id),
        ResourceRef::Goal(id) => goal_team(conn, id),
    }
}

pub fn membership(
    conn: &mut SqliteConnection,
    actor: i32,
    team_id: i32,
) -> Result<Option<Membership>, StorageError> {
    Ok(memberships::table
        .filter(memberships::user_id.eq(actor))
        .filter(memberships::team_id.eq(team_id))
        .select(Membership::as_select())
        .first::<Membership>(conn)
        .optional()?)
}

/// Decides whether `actor` may act on `target` with at least `required` role.
///
/// Pure read; callers run it inside the same transaction as the mutation it
/// guards.
pub fn resolve(
    conn: &mut SqliteConnection,
    actor: i32,
    target: ResourceRef,
    required: Role,
) -> Result<Membership, StorageError> {
    let team_id = owning_team(conn, target)?;
    let Some(m) = membership(conn, actor, team_id)? else {
        tracing::debug!(actor, team_id, kind = target.kind(), "access: not a member");
        return Err(StorageError::forbidden(NO_ACCESS));
    };
    if !m.role().has_at_least(required) {
        tracing::debug!(
            actor,
            team_id,
            kind = target.kind(),
            role = %m.role(),
            required = %required,
            "access: role too low"
        );
        return Err(StorageError::forbidden(INSUFFICIENT_ROLE));
    }
    Ok(m)
}
