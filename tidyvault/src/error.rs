use thiserror::Error;

#[derive(Error, Debug)]
pub enum TidyError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TidyError>;
