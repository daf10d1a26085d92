use std::fmt::Debug;

use async_trait::async_trait;
use error_stack::Report;
use futures::StreamExt;
use kube::api::ListParams;
use kube::api::WatchParams;
use kube::core::ErrorResponse;
use kube::core::ObjectList;
use kube::Api;
use serde::de::DeserializeOwned;

use super::ListWatch;
use super::WatchError;
use super::WatchEvent;
use super::WatchEventStream;

/// The API server's watch timeout must stay below 295 seconds.
const WATCH_TIMEOUT_SECS: u32 = 290;

/// HTTP status the API server uses for an expired resource version.
const STATUS_GONE: u16 = 410;

/// [`ListWatch`] over a Kubernetes API collection.
pub struct KubeListWatch<K> {
    api: Api<K>,
    list_params: ListParams,
    watch_params: WatchParams,
}

impl<K> KubeListWatch<K>
where
    K: kube::Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    pub fn new(api: Api<K>) -> Self {
        Self {
            api,
            list_params: ListParams::default(),
            watch_params: WatchParams::default().timeout(WATCH_TIMEOUT_SECS),
        }
    }
}

#[async_trait]
impl<K> ListWatch for KubeListWatch<K>
where
    K: kube::Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    type Item = K;
    type List = ObjectList<K>;

    async fn list(&self) -> Result<ObjectList<K>, Report<WatchError>> {
        self.api
            .list(&self.list_params)
            .await
            .map_err(|e| from_kube_error(e, |message| WatchError::ListFailed { message }))
    }

    fn items(&self, list: ObjectList<K>) -> Vec<K> {
        list.items
    }

    fn list_resource_version(&self, list: &ObjectList<K>) -> Option<String> {
        list.metadata.resource_version.clone()
    }

    async fn watch(&self, resource_version: &str) -> Result<WatchEventStream<K>, Report<WatchError>> {
        let stream = self
            .api
            .watch(&self.watch_params, resource_version)
            .await
            .map_err(|e| from_kube_error(e, |message| WatchError::WatchFailed { message }))?;

        Ok(stream.map(convert_event).boxed())
    }
}

fn convert_event<K>(
    event: Result<kube::core::WatchEvent<K>, kube::Error>,
) -> Result<WatchEvent<K>, Report<WatchError>> {
    match event {
        Ok(kube::core::WatchEvent::Added(obj)) => Ok(WatchEvent::Added(obj)),
        Ok(kube::core::WatchEvent::Modified(obj)) => Ok(WatchEvent::Modified(obj)),
        Ok(kube::core::WatchEvent::Deleted(obj)) => Ok(WatchEvent::Deleted(obj)),
        Ok(kube::core::WatchEvent::Bookmark(bookmark)) => Ok(WatchEvent::Bookmark {
            resource_version: bookmark.metadata.resource_version,
        }),
        Ok(kube::core::WatchEvent::Error(response)) => Err(from_error_response(response)),
        Err(e) => Err(from_kube_error(e, |message| WatchError::WatchFailed {
            message,
        })),
    }
}

fn from_error_response(response: ErrorResponse) -> Report<WatchError> {
    let message = format!("{} ({}): {}", response.reason, response.code, response.message);
    if response.code == STATUS_GONE {
        Report::new(WatchError::ResourceVersionExpired { message })
    } else {
        Report::new(WatchError::WatchFailed { message })
    }
}

fn from_kube_error(
    error: kube::Error,
    otherwise: impl FnOnce(String) -> WatchError,
) -> Report<WatchError> {
    match error {
        kube::Error::Api(response) if response.code == STATUS_GONE => {
            from_error_response(response)
        }
        other => Report::new(otherwise(other.to_string())),
    }
}
