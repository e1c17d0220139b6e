//! Command trait.

use common::AggregateId;

use crate::aggregate::AggregateRoot;

/// A request to change one aggregate.
///
/// Commands are named in the imperative (`CreateOrder`, `SetPaymentStatus`)
/// and target exactly one aggregate instance.
pub trait Command: Send + Sync {
    /// The aggregate type this command targets.
    type Aggregate: AggregateRoot;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;
}
