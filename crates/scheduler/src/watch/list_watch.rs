use api_types::NamespacedName;
use async_trait::async_trait;
use error_stack::Report;
use futures::stream::BoxStream;
use kube::ResourceExt;

use super::WatchError;

/// One change delivered by a watch stream.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<T> {
    Added(T),
    Modified(T),
    Deleted(T),
    /// Progress marker carrying no object.
    Bookmark { resource_version: String },
}

pub type WatchEventStream<T> = BoxStream<'static, Result<WatchEvent<T>, Report<WatchError>>>;

/// Identity and version accessors the watch engine needs from an object.
pub trait WatchObject: Clone + Send + Sync + 'static {
    fn key(&self) -> NamespacedName;

    fn resource_version(&self) -> Option<String>;
}

impl<K> WatchObject for K
where
    K: kube::Resource + Clone + Send + Sync + 'static,
{
    fn key(&self) -> NamespacedName {
        NamespacedName::new(self.namespace().unwrap_or_default(), self.name_any())
    }

    fn resource_version(&self) -> Option<String> {
        self.meta().resource_version.clone()
    }
}

/// List and watch access to one resource collection.
#[async_trait]
pub trait ListWatch: Send + Sync + 'static {
    type Item: WatchObject;
    type List: Send;

    /// Fetches the whole collection.
    async fn list(&self) -> Result<Self::List, Report<WatchError>>;

    /// Extracts the items of a list response, in order.
    fn items(&self, list: Self::List) -> Vec<Self::Item>;

    /// Collection version the list was taken at.
    fn list_resource_version(&self, list: &Self::List) -> Option<String>;

    /// Opens a change stream starting after `resource_version`.
    ///
    /// Errors that require a relist are reported as
    /// [`WatchError::ResourceVersionExpired`], both here and on the stream.
    async fn watch(
        &self,
        resource_version: &str,
    ) -> Result<WatchEventStream<Self::Item>, Report<WatchError>>;
}
