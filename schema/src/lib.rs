//! This is a Rust library with the runtime pieces of the KTV binary format:
//! the descriptor tree produced by `ktv-compiler` and a dynamic [`Value`]
//! codec that interprets raw data buffers through it.
//!
//! ```
//! use ktv_schema::*;
//!
//! // #Point
//! // x int2
//! // y int2
//! let descriptor = [1, 5, b'P', b'o', b'i', b'n', b't', 2, 1, b'x', 3, 0, 1, b'y', 3, 0];
//! let tree = Tree::decode(&descriptor).unwrap();
//!
//! let value = Value::decode(&tree, "Point", &[0, 1, 0xFF, 0xFF]).unwrap();
//! assert_eq!(format!("{:?}", value), "Point {x: 1, y: -1}");
//! assert_eq!(value.encode(&tree).unwrap(), [0, 1, 0xFF, 0xFF]);
//! ```

pub mod bb;
pub mod schema;
pub mod value;

pub use bb::*;
pub use schema::*;
pub use value::*;

pub const TYPE_CHAR: u8 = 0x01;
pub const TYPE_BYTE: u8 = 0x02;
pub const TYPE_INT2: u8 = 0x03;
pub const TYPE_INT4: u8 = 0x04;
pub const TYPE_ARRAY: u8 = 0x10;
pub const TYPE_MODEL: u8 = 0x11;
pub const TYPE_MODEL_ARRAY: u8 = 0x12;

/// Upper bound for model count, field count and identifier length, all of
/// which are stored in a single length byte.
pub const MAX_COUNT: usize = 255;

/// How many levels of nested models a data buffer may hold below its
/// top-level object.
pub const MAX_DEPTH: usize = 128;
