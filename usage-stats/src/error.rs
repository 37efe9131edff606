use exec_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}
