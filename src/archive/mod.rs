//! Archive record framing
//!
//! Chunks and capture metadata are persisted as self-describing envelope
//! documents so an archive file is just a concatenation of documents. The
//! file writer that appends them and rotates archives lives outside this
//! crate; the record layout and the interim-file naming live here because
//! reading a persisted stream back requires both.

mod paths;
mod record;

pub use paths::{interim_file, interim_temp_file, ARCHIVE_FILE_BASENAME};
pub use record::{
    chunk_data, chunk_samples, metadata_document, metadata_record, metric_chunk_record, record_id,
    record_type, RecordType,
};
