use super::errors::{
    LoaderError,
    WindowError,
};

pub type LoaderResult<T> = Result<T,LoaderError>;
pub type WindowResult<T> = Result<T,WindowError>;
