//! # MQ Arithmetic Entropy Coder
//!
//! A binary arithmetic entropy coder compatible with the MQ-coder of the
//! JPEG 2000 standard (ITU-T T.800 / ISO 15444-1, Annex C). The coder
//! compresses a sequence of binary decisions into a byte stream and
//! losslessly reconstructs the original sequence on decoding.
//!
//! Two probability-driving modes are supported:
//! - *context-adaptive*: each bit carries a context index and the coder
//!   maintains a 47-state adaptive probability estimator per context;
//! - *explicit-probability*: each bit is accompanied by a pre-quantized
//!   probability (see [`coder::probability`]).
//!
//! This library is organized into several modules:
//! - `utils`: error handling shared across the crate
//! - `stream`: the in-memory byte stream the coder reads and writes
//! - `coder`: the MQ codec itself, its state tables and probability
//!   quantization helpers
//!
//! ## Example
//!
//! ```
//! use mq_coder::MqCoder;
//!
//! let mut coder = MqCoder::new(1);
//! for bit in [false, false, true, false] {
//!     coder.encode_bit_context(bit, 0);
//! }
//! coder.terminate_optimal().unwrap();
//!
//! let encoded = coder.change_stream(None);
//! let mut decoder = MqCoder::new(1);
//! decoder.change_stream(Some(encoded));
//! decoder.restart_decoding().unwrap();
//! for expected in [false, false, true, false] {
//!     assert_eq!(decoder.decode_bit_context(0).unwrap(), expected);
//! }
//! ```

// Re-export commonly used types at the crate root
pub use coder::mq::MqCoder;
pub use stream::byte_stream::ByteStream;
pub use utils::error::{MqError, Result};

pub mod utils {
    pub mod error;
}

pub mod stream {
    pub mod byte_stream;
}

pub mod coder {
    pub mod mq;
    pub mod probability;
    pub mod table;

    pub use self::mq::MqCoder;
}
