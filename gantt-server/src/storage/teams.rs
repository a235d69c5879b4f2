use diesel::prelude::*;
use gantt_shared::auth::Role;

use super::access::{self, ResourceRef};
use super::cascade;
use super::models::{Membership, NewMembership, Team, User};
use super::schema::{memberships, teams, users};
use super::{Store, StorageError};

/// Team PATCH. Member lists are addressed by email.
#[derive(Debug, Clone, Default)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub new_users: Vec<String>,
    pub new_users_role: Option<Role>,
    pub delete_users: Vec<String>,
}

fn user_ids_by_email(
    conn: &mut SqliteConnection,
    emails: &[String],
) -> Result<Vec<i32>, StorageError> {
    let mut ids = Vec::with_capacity(emails.len());
    for email in emails {
        let id = users::table
            .filter(users::email.eq(email))
            .select(users::id)
            .first::<i32>(conn)
            .optional()?
            .ok_or_else(|| StorageError::not_found(format!("user {email} not found")))?;
        ids.push(id);
    }
    Ok(ids)
}

impl Store {
    /// Creates a team and makes the actor its first Editor.
    pub async fn create_team(&self, actor: i32, name: &str) -> Result<Team, StorageError> {
        let name = name.to_string();
        self.write_tx(move |conn| {
            let team = diesel::insert_into(teams::table)
                .values(teams::name.eq(&name))
                .returning(Team::as_returning())
                .get_result::<Team>(conn)?;
            diesel::insert_into(memberships::table)
                .values(&NewMembership {
                    user_id: actor,
                    team_id: team.id,
                    role_id: Role::Editor.id(),
                })
                .execute(conn)?;
            Ok(team)
        })
        .await
    }

    pub async fn team_members(
        &self,
        actor: i32,
        team_id: i32,
    ) -> Result<Vec<(User, Role)>, StorageError> {
        self.with_conn(move |conn| {
            access::resolve(conn, actor, ResourceRef::Team(team_id), Role::Reader)?;
            let rows = memberships::table
                .inner_join(users::table)
                .filter(memberships::team_id.eq(team_id))
                .order(users::id.asc())
                .select((User::as_select(), Membership::as_select()))
                .load::<(User, Membership)>(conn)?;
            Ok(rows.into_iter().map(|(u, m)| (u, m.role())).collect())
        })
        .await
    }

    /// Renames and edits membership. Every email is resolved before anything
    /// is written, so an unknown address leaves the team untouched.
    pub async fn update_team(
        &self,
        actor: i32,
        team_id: i32,
        patch: TeamPatch,
    ) -> Result<Team, StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Team(team_id), Role::Editor)?;
            let add_ids = user_ids_by_email(conn, &patch.new_users)?;
            let remove_ids = user_ids_by_email(conn, &patch.delete_users)?;

            if let Some(name) = &patch.name {
                diesel::update(teams::table.filter(teams::id.eq(team_id)))
                    .set(teams::name.eq(name))
                    .execute(conn)?;
            }

            let role = patch.new_users_role.unwrap_or(Role::Reader);
            for user_id in add_ids {
                // Existing members keep their current role
                diesel::insert_into(memberships::table)
                    .values(&NewMembership {
                        user_id,
                        team_id,
                        role_id: role.id(),
                    })
                    .on_conflict((memberships::user_id, memberships::team_id))
                    .do_nothing()
                    .execute(conn)?;
            }

            if !remove_ids.is_empty() {
                diesel::delete(
                    memberships::table
                        .filter(memberships::team_id.eq(team_id))
                        .filter(memberships::user_id.eq_any(&remove_ids)),
                )
                .execute(conn)?;
            }

            Ok(teams::table
                .filter(teams::id.eq(team_id))
                .select(Team::as_select())
                .first::<Team>(conn)?)
        })
        .await
    }

    pub async fn delete_team(&self, actor: i32, team_id: i32) -> Result<(), StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Team(team_id), Role::Editor)?;
            cascade::delete_team_subtree(conn, team_id)
        })
        .await
    }
}
