pub mod memory;
pub mod pg;
pub mod store;

pub use memory::MemoryPollStore;
pub use pg::PgPollStore;
pub use store::PollStore;
