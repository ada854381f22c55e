pub mod bitreader;
pub mod bytereader;
pub mod error;
pub mod logger;
pub mod marker;
pub(crate) mod traits;
pub mod writer;
