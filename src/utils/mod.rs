pub mod format;
pub mod merge_stream;
pub mod paginator;
pub mod table;
pub mod time;
pub mod validation;
