use diesel::prelude::*;

use super::models::MetaItem;
use super::schema::{connection_types, priorities, statuses};
use super::{Store, StorageError};

impl Store {
    /// Upserts the meta catalogs by id. Rows missing from the input are kept,
    /// since tasks and relations may still reference them.
    pub async fn seed_meta(
        &self,
        cfg_statuses: &[MetaItem],
        cfg_priorities: &[MetaItem],
        cfg_connection_types: &[MetaItem],
    ) -> Result<(), StorageError> {
        let statuses_owned = cfg_statuses.to_owned();
        let priorities_owned = cfg_priorities.to_owned();
        let connections_owned = cfg_connection_types.to_owned();
        self.write_tx(move |conn| {
            for s in &statuses_owned {
                diesel::insert_into(statuses::table)
                    .values((statuses::id.eq(s.id), statuses::name.eq(&s.name)))
                    .on_conflict(statuses::id)
                    .do_update()
                    .set(statuses::name.eq(&s.name))
                    .execute(conn)?;
            }
            for p in &priorities_owned {
                diesel::insert_into(priorities::table)
                    .values((priorities::id.eq(p.id), priorities::name.eq(&p.name)))
                    .on_conflict(priorities::id)
                    .do_update()
                    .set(priorities::name.eq(&p.name))
                    .execute(conn)?;
            }
            for c in &connections_owned {
                diesel::insert_into(connection_types::table)
                    .values((
                        connection_types::id.eq(c.id),
                        connection_types::name.eq(&c.name),
                    ))
                    .on_conflict(connection_types::id)
                    .do_update()
                    .set(connection_types::name.eq(&c.name))
                    .execute(conn)?;
            }
            Ok(())
        })
        .await
    }

    pub async fn list_statuses(&self) -> Result<Vec<MetaItem>, StorageError> {
        self.with_conn(|conn| {
            let rows = statuses::table
                .order(statuses::id.asc())
                .select((statuses::id, statuses::name))
                .load::<(i32, String)>(conn)?;
            Ok(rows.into_iter().map(|(id, name)| MetaItem { id, name }).collect())
        })
        .await
    }

    pub async fn list_priorities(&self) -> Result<Vec<MetaItem>, StorageError> {
        self.with_conn(|conn| {
            let rows = priorities::table
                .order(priorities::id.asc())
                .select((priorities::id, priorities::name))
                .load::<(i32, String)>(conn)?;
            Ok(rows.into_iter().map(|(id, name)| MetaItem { id, name }).collect())
        })
        .await
    }

    pub async fn list_connection_types(&self) -> Result<Vec<MetaItem>, StorageError> {
        self.with_conn(|conn| {
            let rows = connection_types::table
                .order(connection_types::id.asc())
                .select((connection_types::id, connection_types::name))
                .load::<(i32, String)>(conn)?;
            Ok(rows.into_iter().map(|(id, name)| MetaItem { id, name }).collect())
        })
        .await
    }
}
