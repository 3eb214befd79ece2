pub mod envelope;
pub mod error;
pub mod message;
pub mod record;

pub use envelope::*;
pub use error::*;
pub use message::*;
pub use record::*;
