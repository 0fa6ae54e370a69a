//! # Subscription API collaborator.
//!
//! Marathon keeps the authoritative list of callback URLs it pushes events to.
//! [`SubscriptionApi`] is the three-call surface the callback transport needs:
//!
//! ```text
//! GET    <member>/v2/eventSubscriptions                 → {"callbackUrls": [...]}
//! POST   <member>/v2/eventSubscriptions?callbackUrl=URL → subscribe
//! DELETE <member>/v2/eventSubscriptions?callbackUrl=URL → unsubscribe
//! ```
//!
//! [`HttpSubscriptionApi`] implements it over `reqwest` against whichever member
//! the [`Cluster`] hands out.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;

use crate::cluster::Cluster;
use crate::error::ApiError;

/// Remote subscription list operations.
#[async_trait]
pub trait SubscriptionApi: Send + Sync + 'static {
    /// Callback URLs currently subscribed.
    async fn subscriptions(&self) -> Result<Vec<String>, ApiError>;

    /// Adds `callback_url` to the subscription list.
    async fn subscribe(&self, callback_url: &str) -> Result<(), ApiError>;

    /// Removes `callback_url` from the subscription list.
    async fn unsubscribe(&self, callback_url: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Subscriptions {
    #[serde(default)]
    callback_urls: Vec<String>,
}

/// `reqwest` implementation of [`SubscriptionApi`].
///
/// A request that fails before any response arrives marks the member down;
/// the error is still returned to the caller.
pub struct HttpSubscriptionApi {
    client: Client,
    cluster: Arc<dyn Cluster>,
    path: String,
}

impl HttpSubscriptionApi {
    pub fn new(client: Client, cluster: Arc<dyn Cluster>, path: impl Into<String>) -> Self {
        Self {
            client,
            cluster,
            path: path.into(),
        }
    }

    async fn send(
        &self,
        method: Method,
        callback_url: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let label = method_label(&method);
        let member = self.cluster.member().ok_or_else(|| ApiError::NoMember {
            method: label,
            path: self.path.clone(),
        })?;
        let url = format!("{member}/{}", self.path.trim_start_matches('/'));

        let mut request = self.client.request(method, &url);
        if let Some(callback) = callback_url {
            request = request.query(&[("callbackUrl", callback)]);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => {
                if source.is_connect() || source.is_timeout() {
                    self.cluster.mark_down(&member);
                }
                return Err(ApiError::Request {
                    method: label,
                    url,
                    source,
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                method: label,
                url,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SubscriptionApi for HttpSubscriptionApi {
    async fn subscriptions(&self) -> Result<Vec<String>, ApiError> {
        let response = self.send(Method::GET, None).await?;
        let url = response.url().to_string();
        let list: Subscriptions = response.json().await.map_err(|e| ApiError::Decode {
            url,
            reason: e.to_string(),
        })?;
        Ok(list.callback_urls)
    }

    async fn subscribe(&self, callback_url: &str) -> Result<(), ApiError> {
        self.send(Method::POST, Some(callback_url)).await.map(drop)
    }

    async fn unsubscribe(&self, callback_url: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, Some(callback_url)).await.map(drop)
    }
}

fn method_label(method: &Method) -> &'static str {
    if *method == Method::GET {
        "GET"
    } else if *method == Method::POST {
        "POST"
    } else if *method == Method::DELETE {
        "DELETE"
    } else {
        "REQUEST"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemberList;
    use crate::testing::FakeMarathon;

    fn api_for(members: &[&str]) -> (HttpSubscriptionApi, Arc<MemberList>) {
        let cluster = Arc::new(MemberList::new(members.iter().copied()));
        let api = HttpSubscriptionApi::new(
            Client::new(),
            cluster.clone() as Arc<dyn Cluster>,
            "/v2/eventSubscriptions",
        );
        (api, cluster)
    }

    #[tokio::test]
    async fn lists_adds_and_removes_callbacks() {
        let marathon = FakeMarathon::start().await;
        let (api, _) = api_for(&[marathon.base_url().as_str()]);

        assert!(api.subscriptions().await.unwrap().is_empty());

        api.subscribe("http://10.0.0.5:10001/api/v3/events?x=1").await.unwrap();
        assert_eq!(marathon.subscriptions().len(), 1);
        assert_eq!(
            api.subscriptions().await.unwrap(),
            vec!["http://10.0.0.5:10001/api/v3/events?x=1".to_string()]
        );

        api.unsubscribe("http://10.0.0.5:10001/api/v3/events?x=1").await.unwrap();
        assert!(api.subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let marathon = FakeMarathon::start().await;
        marathon.fail_with(503);
        let (api, cluster) = api_for(&[marathon.base_url().as_str()]);

        let err = api.subscribe("http://h:1/cb").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 503, method: "POST", .. }));
        // the member answered, so it stays up
        assert_eq!(cluster.healthy().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_member_is_marked_down() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let (api, cluster) = api_for(&[dead.as_str()]);

        let err = api.subscriptions().await.unwrap_err();
        assert!(matches!(err, ApiError::Request { method: "GET", .. }));
        assert_eq!(cluster.member(), None);

        let err = api.subscriptions().await.unwrap_err();
        assert!(matches!(err, ApiError::NoMember { .. }));
    }
}
