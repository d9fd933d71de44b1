//! # Relink Resource
//!
//! Named connection slots kept in line with their providers.
//!
//! A [`Container`] holds one [`Provider`] per resource name. Each pass
//! compares the provider's fingerprint with the one the live connection was
//! built from and rebuilds only on a mismatch: the new connection is
//! published atomically and the old one is closed on a detached task.
//! [`ScheduledContainer`] repeats the pass on a cron or `@every` schedule.

pub mod connection;
pub mod container;
pub mod error;
pub mod fingerprint;
pub mod lifecycle;
pub mod provider;
pub mod resource;
pub mod schedule;
pub mod scheduled;
pub mod testing;

pub use connection::{Connection, ConnectionHandle};
pub use container::{Container, ContainerBuilder, ContainerConfig, ResourceContainer};
pub use error::{BoxError, Error, Result};
pub use fingerprint::Fingerprinter;
pub use lifecycle::{Service, run_service};
pub use provider::Provider;
pub use resource::{Resource, ResourceState};
pub use schedule::{Schedule, Trigger};
pub use scheduled::ScheduledContainer;
