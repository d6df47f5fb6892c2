pub mod arrow;

pub use self::arrow::{build_arrow_schema, to_record_batch};
