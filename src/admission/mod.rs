//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → slots.rs   (try to take a connection slot; none free → 429)
//!     → ticker.rs  (wait for the next rate permit, slot held)
//!     → security   (credential check; denied → 401)
//!     → forward    (upstream call; transport error → 500)
//!     → response relayed, slot released when its body is done
//! ```
//!
//! # Design Decisions
//! - Concurrency gate outermost and non-blocking
//! - Rate gate second and blocking: only slot holders queue for permits
//! - Slot release is tied to ownership, never to explicit calls

pub mod gate;
pub mod slots;
pub mod ticker;

pub use gate::{AdmissionGate, Outcome};
pub use slots::{Slot, SlotPool};
pub use ticker::RateTicker;
