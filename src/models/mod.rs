pub mod alignment;
pub mod mention;
pub mod money;
pub mod order;
pub mod split;

pub use alignment::{AlignmentRecord, AlignmentResult, CountDiscrepancy};
pub use mention::GuestMentionMap;
pub use order::{DigestItem, LineItem, LineMismatch, Order, TotalsReport};
pub use split::{CostSplit, UnassignedItem};
