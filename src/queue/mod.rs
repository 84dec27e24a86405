//! Queueing primitives behind the fetch coordinator

pub mod gate;
pub mod in_flight;
pub mod pending_queue;

pub use gate::Gate;
pub use in_flight::InFlightGuard;
pub use pending_queue::PendingQueue;
