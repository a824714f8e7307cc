use async_trait::async_trait;
use crate::{AgriError, PriceQuery, RawPriceRecord};

/// Trait for upstream sources of commodity price records
#[async_trait]
pub trait PriceRecordSource: Send + Sync {
    async fn fetch_records(&self, query: &PriceQuery) -> Result<Vec<RawPriceRecord>, AgriError>;

    /// Short label used in logs and cache fingerprints
    fn source_name(&self) -> &'static str;
}
