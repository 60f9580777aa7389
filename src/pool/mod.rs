/*!

Counter Pool (§4.6, CP) and its background janitor (§5).

*/

mod backing;
mod janitor;
mod pool;

pub use backing::Backing;
pub use janitor::{Janitor, PoolRegistry};
pub use pool::{AcquireRequest, CounterPool, FieldPool, PoolMemoryReport, Token};
