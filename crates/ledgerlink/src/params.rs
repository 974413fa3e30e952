//! Module params lookup with a best-effort cache.
//!
//! Params change rarely, so answers are cached under `params:<module>` for
//! the configured TTL. The cache is never authoritative: read failures and
//! undecodable entries fall through to the node, and write failures are only
//! logged.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use ledgerlink_cache::Cache;
use ledgerlink_core::CoreError;
use ledgerlink_rpc::Querier;

use crate::error::Result;

/// Query path of module params.
pub const PARAMS_QUERY_PATH: &str = "custom/params/module";

#[derive(Serialize)]
struct ModuleParams<'a> {
    #[serde(rename = "Module")]
    module: &'a str,
}

/// Cached params queries against a node.
pub struct ParamsQuery<Q> {
    querier: Arc<Q>,
    cache: Arc<dyn Cache>,
    expiration: Duration,
}

impl<Q: Querier> ParamsQuery<Q> {
    pub fn new(querier: Arc<Q>, cache: Arc<dyn Cache>, expiration: Duration) -> Self {
        Self {
            querier,
            cache,
            expiration,
        }
    }

    /// Fetch and decode the params of `module`.
    pub async fn query_params<R: DeserializeOwned>(&self, module: &str) -> Result<R> {
        let key = cache_key(module);

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(params) => {
                    debug!(module, "params cache hit");
                    return Ok(params);
                }
                Err(e) => warn!(module, error = %e, "undecodable cached params, re-querying"),
            },
            Ok(None) => {}
            Err(e) => warn!(module, error = %e, "params cache read failed"),
        }

        let data = serde_json::to_vec(&ModuleParams { module })
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        let bytes = self.querier.query(PARAMS_QUERY_PATH, data).await?;
        let params = serde_json::from_slice(&bytes)?;

        if let Err(e) = self
            .cache
            .set_with_expire(&key, Bytes::from(bytes), self.expiration)
            .await
        {
            warn!(module, error = %e, "params cache failed");
        }
        Ok(params)
    }
}

fn cache_key(module: &str) -> String {
    format!("params:{module}")
}
