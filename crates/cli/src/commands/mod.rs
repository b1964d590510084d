pub mod ask;
pub mod docs;
pub mod drive;
pub mod ingest;
pub mod onboard;
pub mod status;
