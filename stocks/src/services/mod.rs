pub mod dedup;
pub mod metrics;
pub mod stock;
pub mod storage;
pub mod traits;

pub use dedup::{HashError, IpHash, IpHasher};
pub use stock::{Lookup, RelativeLikes, StockData, StockLikes, StockService};
pub use storage::{StockRecord, StoreError};
pub use traits::{PriceSource, StockStore};
