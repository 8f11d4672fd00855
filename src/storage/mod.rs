pub mod local_state;
#[cfg(test)]
pub mod memory_repo;
pub mod reconcile;
pub mod repo;
pub mod retry;
pub mod sqlite_repo;
