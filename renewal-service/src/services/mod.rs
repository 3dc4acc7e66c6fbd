pub mod host;
pub mod memory;
pub mod metrics;
pub mod renewal;

pub use host::SubscriptionHost;
pub use memory::MemoryHost;
pub use metrics::{get_metrics, init_metrics};
pub use renewal::{
    strip_order_reference, AdvanceOutcome, AdvancedSubscription, Clock, EventOutcome, HostEvent,
    RenewActive,
};
