pub mod json_store;
pub mod legacy;

pub use json_store::{SCHEMA_VERSION, UserRecord, load_record, save_record, store_path};
