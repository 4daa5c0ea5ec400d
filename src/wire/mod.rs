//! The ICSP wire codec (spec §4.1, §6.1, §6.3).

pub mod checksum;
pub mod message;
pub mod value;

pub use message::Message;
pub use value::{TypeTag, Value};
