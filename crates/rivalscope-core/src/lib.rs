//! RivalScope Core — configuration, errors, identifiers, market allow-list.

pub mod config;
pub mod error;
pub mod market;
pub mod object_id;

pub use config::{DataPaths, RecencySource, RivalScopeConfig, DEFAULT_COLLECTION, PAGE_SIZE};
pub use error::{Error, Result};
pub use market::{MarketAllowList, DEFAULT_MARKETS};
pub use object_id::ObjectId;
