pub mod job;
pub mod migrate;
pub mod version;
pub mod worker;
