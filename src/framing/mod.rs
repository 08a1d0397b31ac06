//! Frame materialization: schema inference, cell coercion and frame assembly.

pub mod builder;
pub mod coerce;
pub mod infer;
pub mod time;

pub use builder::build_frame;
pub use coerce::{Cell, coerce};
pub use infer::{Inferred, infer_type, union_keys};
pub use time::parse_timestamp;
