use thiserror::Error;

use crate::engine::ExtractError;
use crate::queue::DispatchError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Download(#[from] DispatchError<ExtractError>),

    #[error("Could not read downloaded file: {0}")]
    File(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
