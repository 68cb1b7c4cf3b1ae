//! # Threadsafe Object
//!
//! A shared record of independently typed fields used to exchange state
//! between a real-time producer (a control loop reading sensors and driving
//! actuators) and any number of consumer threads (loggers, higher-level
//! controllers).
//!
//! ## Features
//!
//! - **Per-field locking**: a write to one field never contends with access
//!   to another
//! - **Per-field wait**: block until the next update of one field
//! - **Wait for any field**: block on one notification gate shared by all
//!   fields and learn which field changed
//! - **Missed-update detection**: every wakeup checks that exactly one
//!   publish happened since the waiter's baseline
//! - **Bounded waits**: every wait has a timeout variant
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────────────────┐    ┌─────────────────┐
//! │   Producer      │    │  ThreadsafeObject            │    │   Consumer 1    │
//! │                 │    │                              │    │                 │
//! │ set::<I>(v)     ├───►│ FieldStore   [M0|M1|..|Mn]   ├───►│ get::<I>()      │
//! │                 │    │ ChangeTracker                │    │                 │
//! └─────────────────┘    │   counts[n], total           │    └─────────────────┘
//!                        │   gate mutex + condvar       │    ┌─────────────────┐
//!                        │                              ├───►│   Consumer N    │
//!                        └──────────────────────────────┘    │ wait_for_*()    │
//!                                                            └─────────────────┘
//! ```
//!
//! `set` writes under the field's own lock, releases it, then takes the gate
//! lock to bump counters and broadcast. The two locks are never nested.
//!
//! ## Usage
//!
//! ```rust
//! use std::thread;
//! use tso_object::ThreadsafeObject;
//!
//! const POSITION: usize = 0;
//! const CURRENT: usize = 1;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let object = ThreadsafeObject::new((0.0_f64, 0.0_f64)).into_shared();
//! let baseline = object.snapshot();
//!
//! let producer = object.clone();
//! thread::spawn(move || producer.set::<POSITION>(1.0)).join().ok();
//!
//! let changed = object.wait_for_any_update_since(&baseline, None)?;
//! assert_eq!(changed, POSITION);
//! assert_eq!(object.get::<POSITION>(), 1.0);
//! assert_eq!(object.modification_count(CURRENT), Some(0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Waits return `Result<T, ObjectError>`. Lost or merged updates are
//! contract violations ([`ObjectError::is_violation`]); with
//! [`ViolationPolicy::Abort`] the object logs them and aborts the process
//! instead of returning.
//!
//! ## Thread Safety
//!
//! - **ThreadsafeObject**: `Send + Sync` when every field type is `Send`
//! - **wait_for_any_update**: requires writes to different fields to be
//!   serialized; use `wait_for_any_updates_since` otherwise

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod device;
pub mod error;
pub mod fields;
pub mod object;
pub mod tracker;

pub use config::{ObjectConfig, ViolationPolicy};
pub use device::InputOutput;
pub use error::{ObjectError, ObjectResult};
pub use fields::{FieldAt, FieldStore, FieldTuple};
pub use object::{SharedObject, ThreadsafeObject};
pub use tracker::{ChangeTracker, ChangedFields, CounterSnapshot, FieldChange};
pub use tso::consts::MAX_FIELDS;

/// Initialize tracing for RT-safe logging
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
