use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model kept calling tools after {0} rounds")]
    ToolLoopLimit(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
