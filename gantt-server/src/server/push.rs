use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use gantt_shared::api::ReminderPayload;
use tracing::{info, warn};
use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder,
};

use crate::storage::{StorageError, Store, models::PushSubscription};

use super::config::AppConfig;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The push service no longer knows the endpoint; the subscription should go.
    #[error("subscription gone: {0}")]
    Gone(String),
    #[error("push failed: {0}")]
    Failed(String),
}

/// Delivers one encrypted message to one browser subscription.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8])
    -> Result<(), PushError>;
}

/// VAPID-signed Web Push over hyper.
pub struct WebPushSender {
    client: HyperWebPushClient,
    vapid_private: String,
    contact: Option<String>,
}

impl WebPushSender {
    pub fn new(vapid_private: String, contact: Option<String>) -> Self {
        Self {
            client: HyperWebPushClient::new(),
            vapid_private,
            contact,
        }
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<(), PushError> {
        let subscription_info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );

        let mut builder = WebPushMessageBuilder::new(&subscription_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);

        let mut vapid = VapidSignatureBuilder::from_base64(&self.vapid_private, &subscription_info)
            .map_err(|e| PushError::Failed(e.to_string()))?;
        if let Some(contact) = &self.contact {
            vapid.add_claim("sub", contact.clone());
        }
        let signature = vapid
            .build()
            .map_err(|e| PushError::Failed(e.to_string()))?;
        builder.set_vapid_signature(signature);
        let message = builder
            .build()
            .map_err(|e| PushError::Failed(e.to_string()))?;

        match self.client.send(message).await {
            Ok(()) => Ok(()),
            Err(err @ (WebPushError::EndpointNotFound(_) | WebPushError::EndpointNotValid(_))) => {
                Err(PushError::Gone(err.to_string()))
            }
            Err(err) => Err(PushError::Failed(err.to_string())),
        }
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub subscriptions: usize,
    pub delivered: usize,
}

/// Fans a payload out to every subscription of a user and keeps the
/// per-subscription delivery bookkeeping.
#[derive(Clone)]
pub struct PushService {
    inner: Arc<PushServiceInner>,
}

struct PushServiceInner {
    store: Store,
    sender: Arc<dyn PushSender>,
}

impl PushService {
    pub fn from_config(cfg: &AppConfig, store: Store) -> Option<Self> {
        let push_cfg = cfg.push.as_ref()?;
        if !push_cfg.enabled {
            return None;
        }
        let vapid_private = push_cfg.vapid_private.clone()?;
        if cfg.vapid_public_key().is_none() || vapid_private.trim().is_empty() {
            warn!("push: missing VAPID key(s); disabling push service");
            return None;
        }
        let sender = WebPushSender::new(vapid_private, push_cfg.contact_email.clone());
        Some(Self::with_sender(store, Arc::new(sender)))
    }

    pub fn with_sender(store: Store, sender: Arc<dyn PushSender>) -> Self {
        Self {
            inner: Arc::new(PushServiceInner { store, sender }),
        }
    }

    /// Sends to all of the user's subscriptions concurrently. Individual
    /// failures are logged and recorded, never propagated.
    pub async fn notify_user(
        &self,
        user_id: i32,
        payload: &ReminderPayload,
    ) -> Result<DeliveryReport, StorageError> {
        let subs = self.subscriptions(user_id).await?;
        Ok(self.deliver(user_id, &subs, payload).await)
    }

    pub async fn subscriptions(&self, user_id: i32) -> Result<Vec<PushSubscription>, StorageError> {
        self.inner.store.list_push_subscriptions(user_id).await
    }

    /// Delivery half of [`PushService::notify_user`] for an already loaded
    /// subscription list.
    pub async fn deliver(
        &self,
        user_id: i32,
        subs: &[PushSubscription],
        payload: &ReminderPayload,
    ) -> DeliveryReport {
        let mut report = DeliveryReport {
            subscriptions: subs.len(),
            delivered: 0,
        };
        if subs.is_empty() {
            info!(user_id, "push: no subscriptions");
            return report;
        }
        let body = match serde_json::to_vec(payload) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "push: failed to encode payload");
                return report;
            }
        };
        let results = join_all(subs.iter().map(|sub| self.inner.send_single(sub, &body))).await;
        report.delivered = results.into_iter().filter(|ok| *ok).count();
        report
    }
}

impl PushServiceInner {
    async fn send_single(&self, subscription: &PushSubscription, payload: &[u8]) -> bool {
        let endpoint = &subscription.endpoint;
        match self.sender.send(subscription, payload).await {
            Ok(()) => {
                info!(endpoint = %endpoint, "push: delivered");
                if let Err(e) = self
                    .store
                    .mark_push_delivery_result(subscription.id, true, None)
                    .await
                {
                    warn!(endpoint = %endpoint, error = %e, "push: failed to mark success");
                }
                true
            }
            Err(err) => {
                let err_str = err.to_string();
                warn!(endpoint = %endpoint, error = %err_str, "push: send failed");

                if let Err(e) = self
                    .store
                    .mark_push_delivery_result(subscription.id, false, Some(&err_str))
                    .await
                {
                    warn!(endpoint = %endpoint, error = %e, "push: failed to mark error");
                }

                if matches!(err, PushError::Gone(_)) {
                    match self.store.prune_push_subscription(subscription.id).await {
                        Ok(_) => warn!(endpoint = %endpoint, "push: pruned stale subscription"),
                        Err(e) => warn!(
                            endpoint = %endpoint,
                            error = %e,
                            "push: failed to remove stale subscription"
                        ),
                    }
                }
                false
            }
        }
    }
}
