mod error;
mod keys;
mod registry;
mod serialization;
mod stats;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{cache_key, ReadOperation, ReadRequest};
pub use registry::KeyRegistry;
pub use serialization::{deserialize_value, serialize_value, SerializationError};
pub use stats::CacheStats;
pub use traits::{Cache, RefreshErrorHandler};
