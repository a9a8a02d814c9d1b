//! Integrations with external quality and security data providers.

use async_trait::async_trait;
use serde_json::Value;

use crate::contracts::ComponentTarget;

/// Document returned by a data provider.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedDocument {
    /// Provider returned a document.
    Present(Value),
    /// Provider had no data or could not be reached.
    Absent,
}

impl FetchedDocument {
    /// Returns the document when present.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

impl From<Option<Value>> for FetchedDocument {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

/// Fetch operation bound to one data source.
///
/// Implementations never fail: transport and decoding problems are logged and
/// reported as [`FetchedDocument::Absent`].
#[async_trait]
pub trait DataFetcher: Send + Sync {
    /// Fetches the document describing `target`.
    async fn fetch(&self, target: &ComponentTarget) -> FetchedDocument;
}
