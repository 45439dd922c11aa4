//! Core type definitions for sqlmorph.
//!
//! - [`data_type`]: canonical type categories and size-qualified variants.
//! - [`schema`]: the immutable table/column snapshot a check runs against.
//! - [`random`]: the explicit, seeded random source threaded through
//!   generation.

pub mod data_type;
pub mod random;
pub mod schema;

pub use data_type::{CompositeDataType, DataType, TypeCategory, supports_return_type};
pub use random::RandomSource;
pub use schema::{Column, ColumnDef, Schema, Table, Tables};
