//! # Sources
//!
//! Concrete `DataSource` implementations.
//!
//! Responsibilities:
//! - Mock sources for tests and demos
//! - Line-oriented file source
//! - Channel-backed source fed by another thread
//! - Factory from `SourceConfig`
//!
//! ## Usage Example
//!
//! ```ignore
//! use sources::ChannelSource;
//!
//! let (tx, source) = ChannelSource::bounded(16);
//! std::thread::spawn(move || {
//!     for i in 0..3 {
//!         tx.send_blocking(format!("item-{i}")).ok();
//!     }
//! });
//! while let Some(item) = source.next()? {
//!     // Process item
//! }
//! ```

mod channel;
mod factory;
mod lines;
mod mock;

pub use channel::ChannelSource;
pub use contracts::{DataSource, SourceError};
pub use factory::build_source;
pub use lines::LineSource;
pub use mock::{EndSignal, MockSource};
