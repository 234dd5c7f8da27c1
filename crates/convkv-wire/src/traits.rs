use crate::error::Result;
use crate::types::{CausalContext, Location, MapOperation, RawCommandResult, TsRow, ValueWrite};
use async_trait::async_trait;

/// Abstraction for a connection to the key-value store.
///
/// Every method issues exactly one request and returns its raw result. No
/// retry or batching happens behind this trait; cancellation and timeouts are
/// the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Apply a map update, merged causally against `context` when present.
    async fn update_map(
        &self,
        location: &Location,
        op: MapOperation,
        context: Option<CausalContext>,
    ) -> Result<RawCommandResult>;

    /// Fetch a map as a response tree plus its context.
    async fn fetch_map(&self, location: &Location) -> Result<RawCommandResult>;

    /// Store a plain value.
    async fn store_value(&self, location: &Location, write: ValueWrite) -> Result<RawCommandResult>;

    /// Fetch a plain value; the result may carry several siblings.
    async fn fetch_value(&self, location: &Location) -> Result<RawCommandResult>;

    async fn delete_value(&self, location: &Location) -> Result<RawCommandResult>;

    /// List every key of the location's bucket.
    async fn list_keys(&self, location: &Location) -> Result<RawCommandResult>;

    /// Keys whose `index` entry equals `value`. A limit of 0 means unlimited.
    async fn index_query(
        &self,
        location: &Location,
        index: &str,
        value: &str,
        limit: u32,
    ) -> Result<RawCommandResult>;

    async fn ts_store_rows(&self, table: &str, rows: Vec<TsRow>) -> Result<RawCommandResult>;

    async fn ts_query(&self, query: &str) -> Result<RawCommandResult>;
}
