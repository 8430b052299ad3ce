pub mod stack_store;
pub mod sync_dispatcher;

pub use stack_store::StackStore;
pub use sync_dispatcher::SyncDispatcher;
