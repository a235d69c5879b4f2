use diesel::prelude::*;
use gantt_shared::auth::Role;

use super::access::{self, ResourceRef};
use super::cascade;
use super::models::{NewStream, Stream};
use super::schema::streams;
use super::{Store, StorageError};

const DUPLICATE: &str = "stream with this name already exists in the project";

fn ensure_unique_name(
    conn: &mut SqliteConnection,
    project_id: i32,
    name: &str,
    exclude: Option<i32>,
) -> Result<(), StorageError> {
    let mut query = streams::table
        .filter(streams::project_id.eq(project_id))
        .filter(streams::name.eq(name))
        .into_boxed();
    if let Some(id) = exclude {
        query = query.filter(streams::id.ne(id));
    }
    let count: i64 = query.count().get_result(conn)?;
    if count > 0 {
        return Err(StorageError::conflict(DUPLICATE));
    }
    Ok(())
}

fn load_stream(conn: &mut SqliteConnection, stream_id: i32) -> Result<Stream, StorageError> {
    Ok(streams::table
        .filter(streams::id.eq(stream_id))
        .select(Stream::as_select())
        .first::<Stream>(conn)?)
}

impl Store {
    pub async fn list_streams(
        &self,
        actor: i32,
        project_id: i32,
    ) -> Result<Vec<Stream>, StorageError> {
        self.with_conn(move |conn| {
            access::resolve(conn, actor, ResourceRef::Project(project_id), Role::Reader)?;
            Ok(streams::table
                .filter(streams::project_id.eq(project_id))
                .order(streams::id.asc())
                .select(Stream::as_select())
                .load::<Stream>(conn)?)
        })
        .await
    }

    pub async fn get_stream(&self, actor: i32, stream_id: i32) -> Result<Stream, StorageError> {
        self.with_conn(move |conn| {
            access::resolve(conn, actor, ResourceRef::Stream(stream_id), Role::Reader)?;
            load_stream(conn, stream_id)
        })
        .await
    }

    pub async fn create_stream(
        &self,
        actor: i32,
        project_id: i32,
        name: &str,
    ) -> Result<Stream, StorageError> {
        let name = name.to_string();
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Project(project_id), Role::Editor)?;
            ensure_unique_name(conn, project_id, &name, None)?;
            Ok(diesel::insert_into(streams::table)
                .values(&NewStream {
                    project_id,
                    name: &name,
                })
                .returning(Stream::as_returning())
                .get_result::<Stream>(conn)?)
        })
        .await
        .map_err(|e| e.unique_as_conflict(DUPLICATE))
    }

    pub async fn update_stream(
        &self,
        actor: i32,
        stream_id: i32,
        name: Option<String>,
    ) -> Result<Stream, StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Stream(stream_id), Role::Editor)?;
            let current = load_stream(conn, stream_id)?;
            let Some(name) = name.filter(|n| *n != current.name) else {
                return Ok(current);
            };
            ensure_unique_name(conn, current.project_id, &name, Some(stream_id))?;
            Ok(diesel::update(streams::table.filter(streams::id.eq(stream_id)))
                .set(streams::name.eq(&name))
                .returning(Stream::as_returning())
                .get_result::<Stream>(conn)?)
        })
        .await
        .map_err(|e| e.unique_as_conflict(DUPLICATE))
    }

    pub async fn delete_stream(&self, actor: i32, stream_id: i32) -> Result<(), StorageError> {
        self.write_tx(move |conn| {
            access::resolve(conn, actor, ResourceRef::Stream(stream_id), Role::Editor)?;
            cascade::delete_stream_subtree(conn, stream_id)
        })
        .await
    }
}
