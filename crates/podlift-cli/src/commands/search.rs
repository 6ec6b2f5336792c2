//! Handler for `podlift search`.

use miette::Result;

use podlift_core::config::GlobalConfig;
use podlift_ops::ops_search::{self, SearchOptions};

pub fn exec(config: &GlobalConfig, module: &str, constraint: Option<String>) -> Result<()> {
    let opts = SearchOptions {
        module: module.to_string(),
        constraint,
    };
    ops_search::search(config, &opts)
}
