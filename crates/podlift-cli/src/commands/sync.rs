//! Handler for `podlift sync`.

use miette::Result;

use podlift_core::config::GlobalConfig;
use podlift_ops::ops_sync;

pub async fn exec(config: &GlobalConfig) -> Result<()> {
    ops_sync::sync(config).await
}
