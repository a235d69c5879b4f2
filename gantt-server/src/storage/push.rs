use chrono::Utc;
use diesel::prelude::*;
use tracing::trace;

use super::models::{NewPushSubscription, PushSubscription};
use super::schema::push_subscriptions::dsl as ps;
use super::{Store, StorageError};

impl Store {
    /// Appends a subscription. Re-subscribing the same endpoint adds a new row.
    pub async fn add_push_subscription(
        &self,
        user_id: i32,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<PushSubscription, StorageError> {
        let endpoint = endpoint.to_string();
        let p256dh = p256dh.to_string();
        let auth = auth.to_string();
        trace!(user_id, endpoint = %endpoint, "add_push_subscription starting");
        self.with_conn(move |conn| {
            Ok(diesel::insert_into(ps::push_subscriptions)
                .values(&NewPushSubscription {
                    user_id,
                    endpoint: &endpoint,
                    p256dh: &p256dh,
                    auth: &auth,
                })
                .returning(PushSubscription::as_returning())
                .get_result::<PushSubscription>(conn)?)
        })
        .await
    }

    pub async fn list_push_subscriptions(
        &self,
        user_id: i32,
    ) -> Result<Vec<PushSubscription>, StorageError> {
        self.with_conn(move |conn| {
            Ok(ps::push_subscriptions
                .filter(ps::user_id.eq(user_id))
                .order(ps::id.asc())
                .select(PushSubscription::as_select())
                .load::<PushSubscription>(conn)?)
        })
        .await
    }

    /// Owner-only removal.
    pub async fn remove_push_subscription(
        &self,
        actor: i32,
        subscription_id: i32,
    ) -> Result<(), StorageError> {
        self.write_tx(move |conn| {
            let owner = ps::push_subscriptions
                .filter(ps::id.eq(subscription_id))
                .select(ps::user_id)
                .first::<i32>(conn)
                .optional()?
                .ok_or_else(|| StorageError::not_found("subscription not found"))?;
            if owner != actor {
                return Err(StorageError::forbidden("no access to this subscription"));
            }
            diesel::delete(ps::push_subscriptions.filter(ps::id.eq(subscription_id)))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    /// Drops a subscription the push service reported as gone.
    pub async fn prune_push_subscription(&self, subscription_id: i32) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let deleted =
                diesel::delete(ps::push_subscriptions.filter(ps::id.eq(subscription_id)))
                    .execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    pub async fn mark_push_delivery_result(
        &self,
        id: i32,
        success: bool,
        error: Option<&str>,
    ) -> Result<(), StorageError> {
        let error_owned = error.map(|s| s.to_string());
        self.with_conn(move |conn| {
            let now = Utc::now().naive_utc();
            if success {
                diesel::update(ps::push_subscriptions.filter(ps::id.eq(id)))
                    .set((
                        ps::last_success_at.eq(Some(now)),
                        ps::last_error.eq::<Option<String>>(None::<String>),
                    ))
                    .execute(conn)?;
            } else {
                diesel::update(ps::push_subscriptions.filter(ps::id.eq(id)))
                    .set(ps::last_error.eq(error_owned.as_deref()))
                    .execute(conn)?;
            }
            Ok(())
        })
        .await
    }
}
