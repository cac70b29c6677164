//! Storage backend traits.

mod record_store;

pub use record_store::{
    ListRecordStore, RecordStore, RecordStream, find_user, watch_distinct, watch_stream,
};
