//! Binary wire codec.
//!
//! All integers are little-endian and fixed width. Strings and byte
//! strings carry a `u32` length prefix. Doubles travel in the sortable
//! form from [`crate::core::sortable`], so their byte order matches
//! their numeric order.

mod decoder;
mod encoder;

pub use decoder::Decoder;
pub use encoder::Encoder;
