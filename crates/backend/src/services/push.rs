//! Notification persistence and web-push fan-out.
//!
//! The notification record is written first, so in-app history survives any
//! delivery outcome. Delivery then fans out to every active endpoint
//! concurrently; a permanently-gone endpoint is deactivated without touching
//! its siblings.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel_async::AsyncPgConnection;
use futures::future::join_all;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use shared_types::{DeliveryReport, NotificationCategory, NotificationPriority};
use std::time::Duration as StdDuration;
use thiserror::Error;
use uuid::Uuid;

use crate::db;
use crate::error::ApiError;

/// Notification records are removable after this long.
pub const EXPIRY_DAYS: i64 = 30;

/// Per-endpoint delivery failure.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The push service reports the subscription no longer exists.
    #[error("endpoint gone")]
    Gone,
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// One registered push endpoint, as needed for delivery. The client keys ride
/// along for provider implementations that encrypt payloads.
#[derive(Debug, Clone)]
pub struct PushTarget {
    pub id: Uuid,
    pub endpoint: String,
    #[allow(dead_code)]
    pub p256dh: String,
    #[allow(dead_code)]
    pub auth: String,
}

/// Push delivery boundary; mocked in fan-out tests.
#[async_trait]
pub trait PushProvider {
    async fn deliver(&self, target: &PushTarget) -> Result<(), DeliveryError>;
}

/// VAPID configuration for the web-push client.
#[derive(Clone)]
pub struct PushConfig {
    pub vapid_public_key: String,
    pub vapid_private_key_pem: String,
    pub contact: String,
    pub timeout: StdDuration,
}

impl PushConfig {
    /// Load from `VAPID_PUBLIC_KEY` / `VAPID_PRIVATE_KEY_PEM` /
    /// `VAPID_CONTACT_EMAIL`. Returns `None` when the key pair is absent, in
    /// which case notifications are recorded but never pushed.
    pub fn from_env() -> Option<Self> {
        let vapid_public_key = std::env::var("VAPID_PUBLIC_KEY").ok()?;
        let vapid_private_key_pem = std::env::var("VAPID_PRIVATE_KEY_PEM").ok()?;
        let contact = format!(
            "mailto:{}",
            std::env::var("VAPID_CONTACT_EMAIL")
                .unwrap_or_else(|_| "contact@freefor.games".to_string())
        );
        Some(Self {
            vapid_public_key,
            vapid_private_key_pem,
            contact,
            timeout: StdDuration::from_secs(10),
        })
    }
}

#[derive(Debug, Serialize)]
struct VapidClaims {
    aud: String,
    exp: i64,
    sub: String,
}

/// Web-push delivery via VAPID-authorized POSTs.
///
/// Deliveries are payload-less "tickles": the service worker wakes and pulls
/// unread notifications from the API, so no per-message encryption is carried
/// here.
pub struct WebPushClient {
    http: reqwest::Client,
    public_key: String,
    signing_key: EncodingKey,
    contact: String,
}

impl WebPushClient {
    pub fn new(config: &PushConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let signing_key = EncodingKey::from_ec_pem(config.vapid_private_key_pem.as_bytes())?;
        Ok(Self {
            http,
            public_key: config.vapid_public_key.clone(),
            signing_key,
            contact: config.contact.clone(),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    fn vapid_header(&self, endpoint: &str) -> Result<String, DeliveryError> {
        let aud = endpoint_origin(endpoint)?;
        let claims = VapidClaims {
            aud,
            exp: (Utc::now() + Duration::hours(12)).timestamp(),
            sub: self.contact.clone(),
        };
        let token = encode(&Header::new(Algorithm::ES256), &claims, &self.signing_key)
            .map_err(|e| DeliveryError::Failed(format!("vapid signing failed: {}", e)))?;
        Ok(format!("vapid t={}, k={}", token, self.public_key))
    }
}

/// The push-service origin a VAPID token is scoped to.
pub fn endpoint_origin(endpoint: &str) -> Result<String, DeliveryError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| DeliveryError::Failed(format!("bad endpoint url: {}", e)))?;
    Ok(url.origin().ascii_serialization())
}

#[async_trait]
impl PushProvider for WebPushClient {
    async fn deliver(&self, target: &PushTarget) -> Result<(), DeliveryError> {
        let authorization = self.vapid_header(&target.endpoint)?;

        let response = self
            .http
            .post(&target.endpoint)
            .header("Authorization", authorization)
            .header("TTL", "2419200")
            .send()
            .await
            .map_err(|e| DeliveryError::Failed(e.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            404 | 410 => Err(DeliveryError::Gone),
            _ if status.is_success() => Ok(()),
            code => Err(DeliveryError::Failed(format!(
                "push service returned {}",
                code
            ))),
        }
    }
}

/// Deliver to every target concurrently; per-target outcomes are independent.
pub async fn fan_out<P: PushProvider + Sync>(
    provider: &P,
    targets: &[PushTarget],
) -> Vec<(Uuid, Result<(), DeliveryError>)> {
    let deliveries = targets.iter().map(|target| async move {
        let outcome = provider.deliver(target).await;
        (target.id, outcome)
    });
    join_all(deliveries).await
}

/// Persist a notification for `target_user` and push it to all their active
/// endpoints.
///
/// The call succeeds once the record is stored, whatever delivery does; the
/// report carries attempted vs delivered counts.
#[allow(clippy::too_many_arguments)]
pub async fn notify<P: PushProvider + Sync>(
    conn: &mut AsyncPgConnection,
    provider: Option<&P>,
    target_user: Uuid,
    title: &str,
    body: &str,
    category: NotificationCategory,
    priority: NotificationPriority,
    payload: Value,
) -> Result<DeliveryReport, ApiError> {
    let expires_at = default_expiry(Utc::now());
    let record = db::notifications::create(
        conn,
        target_user,
        title,
        body,
        category.as_str(),
        &payload.to_string(),
        priority.as_str(),
        expires_at,
    )
    .await?;

    let provider = match provider {
        Some(provider) => provider,
        None => {
            tracing::debug!("Push disabled; notification {} recorded only", record.id);
            return Ok(DeliveryReport {
                notification_id: record.id,
                attempted: 0,
                delivered: 0,
            });
        }
    };

    let endpoints = db::push_endpoints::list_active(conn, target_user).await?;
    if endpoints.is_empty() {
        tracing::debug!("No active push endpoints for user {}", target_user);
        return Ok(DeliveryReport {
            notification_id: record.id,
            attempted: 0,
            delivered: 0,
        });
    }

    let targets: Vec<PushTarget> = endpoints
        .iter()
        .map(|row| PushTarget {
            id: row.id,
            endpoint: row.endpoint_url.clone(),
            p256dh: row.p256dh.clone(),
            auth: row.auth_key.clone(),
        })
        .collect();

    let results = fan_out(provider, &targets).await;

    let mut delivered = 0;
    for (endpoint_id, outcome) in &results {
        match outcome {
            Ok(()) => {
                delivered += 1;
                db::push_endpoints::mark_used(conn, *endpoint_id).await?;
            }
            Err(DeliveryError::Gone) => {
                tracing::info!("Push endpoint {} is gone, deactivating", endpoint_id);
                db::push_endpoints::deactivate(conn, *endpoint_id, "endpoint gone").await?;
            }
            Err(DeliveryError::Failed(msg)) => {
                tracing::warn!("Push delivery to endpoint {} failed: {}", endpoint_id, msg);
            }
        }
    }

    Ok(DeliveryReport {
        notification_id: record.id,
        attempted: targets.len(),
        delivered,
    })
}

/// Expiry stamp for a record created now.
pub fn default_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::days(EXPIRY_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockPush {
        outcomes: HashMap<String, Result<(), DeliveryError>>,
    }

    #[async_trait]
    impl PushProvider for MockPush {
        async fn deliver(&self, target: &PushTarget) -> Result<(), DeliveryError> {
            match self.outcomes.get(&target.endpoint) {
                Some(Ok(())) | None => Ok(()),
                Some(Err(DeliveryError::Gone)) => Err(DeliveryError::Gone),
                Some(Err(DeliveryError::Failed(msg))) => Err(DeliveryError::Failed(msg.clone())),
            }
        }
    }

    fn target(endpoint: &str) -> PushTarget {
        PushTarget {
            id: Uuid::new_v4(),
            endpoint: endpoint.to_string(),
            p256dh: "p256dh-key".to_string(),
            auth: "auth-key".to_string(),
        }
    }

    #[tokio::test]
    async fn fan_out_with_no_targets_attempts_nothing() {
        let provider = MockPush {
            outcomes: HashMap::new(),
        };
        let results = fan_out(&provider, &[]).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn gone_endpoint_does_not_affect_siblings() {
        let provider = MockPush {
            outcomes: HashMap::from([
                (
                    "https://push.example/gone".to_string(),
                    Err(DeliveryError::Gone),
                ),
                ("https://push.example/ok".to_string(), Ok(())),
            ]),
        };
        let targets = vec![
            target("https://push.example/gone"),
            target("https://push.example/ok"),
        ];

        let results = fan_out(&provider, &targets).await;
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0].1, Err(DeliveryError::Gone)));
        assert!(results[1].1.is_ok());
    }

    #[tokio::test]
    async fn failed_delivery_is_isolated_per_endpoint() {
        let provider = MockPush {
            outcomes: HashMap::from([(
                "https://push.example/flaky".to_string(),
                Err(DeliveryError::Failed("timeout".to_string())),
            )]),
        };
        let targets = vec![
            target("https://push.example/flaky"),
            target("https://push.example/a"),
            target("https://push.example/b"),
        ];

        let results = fan_out(&provider, &targets).await;
        let delivered = results.iter().filter(|(_, r)| r.is_ok()).count();
        assert_eq!(delivered, 2);
    }

    #[test]
    fn endpoint_origin_strips_path_and_query() {
        let origin =
            endpoint_origin("https://fcm.googleapis.com/fcm/send/abc123?auth=xyz").unwrap();
        assert_eq!(origin, "https://fcm.googleapis.com");
    }

    #[test]
    fn endpoint_origin_rejects_garbage() {
        assert!(endpoint_origin("not a url").is_err());
    }
}
