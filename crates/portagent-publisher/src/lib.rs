//! Packet publishers.
//!
//! Framed packets leave the port agent through a [`Publisher`]. Delivery
//! failures are logged and reported as `false` from [`Publisher::handle`];
//! they never propagate past the publisher boundary.

pub mod command;
pub mod driver;
pub mod error;
pub mod file;
pub mod list;
pub mod log;
pub mod traits;

pub use command::InstrumentCommandPublisher;
pub use driver::DriverPublisher;
pub use error::{PublisherError, Result};
pub use file::{FilePublisher, PublisherFormat};
pub use list::PublisherList;
pub use log::LogPublisher;
pub use traits::Publisher;
