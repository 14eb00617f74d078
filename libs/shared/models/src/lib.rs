pub mod error;
pub mod slot;

pub use error::StoreError;
pub use slot::{DateKey, SlotKey, SlotParseError, TimeString};
