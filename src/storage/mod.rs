pub mod session_file;

pub use session_file::{
    default_channel_names, SessionFile, SessionStore, StorageError, SINGLE_CHANNEL_TIME_HEADER,
    TIME_HEADER,
};
