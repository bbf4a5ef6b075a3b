pub mod message;
pub mod speaking;
pub mod streaming;

pub use message::Message;
pub use speaking::{
    DEFAULT_PROVIDER, Direction, Field, FieldValue, Fields, ReferenceType, Speaking, Status,
};
pub use streaming::{Gender, Streaming, VendorName};
