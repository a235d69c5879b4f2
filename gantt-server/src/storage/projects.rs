use diesel::prelude::*;
use gantt_shared::auth::Role;

use super::access::{self, ResourceRef};
use super::cascade;
use super::models::{NewProject, Project};
use super::schema::projects;
use super::{Store, StorageError};

const DUPLICATE: &str = "project with this name already exists in the team";

fn ensure_unique_name(
    conn: &mut SqliteConnection,
    team_id: i32,
    name: &str,
    exclude: Option<i32>,
) -> Result<(), StorageError> {
    let mut query = projects::table
        .filter(projects::team_id.eq(team_id))
        .filter(projects::name.eq(name))
        .into_boxed();
    if let Some(id) = exclude {
        query = query.filter(projects::id.ne(id));
    }
    let count: i64 = query.count().get_result(conn)?;
    if count > 0 {
        return Err(StorageError::conflict(DUPLICATE));
    }
    Ok(())
}

impl Store {
    pub async fn list_projects(
        &self,
        actor: i32,
        team_id: i32,
    ) -> Result<Vec<Project>, StorageError> {
        self.with_conn(move |conn| {
            access::resolve(conn, actor, ResourceRef::Team(team_id), Role::Reader)?;
            Ok(projects::table
                .filter(projects::team_id.eq(team_id))
                .order(projects::id.asc())
                .select(Project::as_select())
                .load::<Project>(conn)?)
        })
        .await
    }

    pub async fn create_project(
        &self,
        actor: i32,
        team_id: i32,
        name: &str,
    ) -> Result<Project, StorageError> {
        let name = name.to_string();
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Team(team_id), Role::Editor)?;
            ensure_unique_name(conn, team_id, &name, None)?;
            Ok(diesel::insert_into(projects::table)
                .values(&NewProject {
                    team_id,
                    name: &name,
                })
                .returning(Project::as_returning())
                .get_result::<Project>(conn)?)
        })
        .await
        .map_err(|e| e.unique_as_conflict(DUPLICATE))
    }

    pub async fn update_project(
        &self,
        actor: i32,
        project_id: i32,
        name: Option<String>,
    ) -> Result<Project, StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Project(project_id), Role::Editor)?;
            let current = projects::table
                .filter(projects::id.eq(project_id))
                .select(Project::as_select())
                .first::<Project>(conn)?;
            let Some(name) = name.filter(|n| *n != current.name) else {
                return Ok(current);
            };
            ensure_unique_name(conn, current.team_id, &name, Some(project_id))?;
            Ok(diesel::update(projects::table.filter(projects::id.eq(project_id)))
                .set(projects::name.eq(&name))
                .returning(Project::as_returning())
                .get_result::<Project>(conn)?)
        })
        .await
        .map_err(|e| e.unique_as_conflict(DUPLICATE))
    }

    pub async fn delete_project(&self, actor: i32, project_id: i32) -> Result<(), StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Project(project_id), Role::Editor)?;
            cascade::delete_project_subtree(conn, project_id)
        })
        .await
    }
}
