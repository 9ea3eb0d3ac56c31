use std::fmt::Display;

#[derive(Debug,Clone,PartialEq)]
pub enum LoaderError {
    ProducerPanicked{
        message: String,
    },
    ThreadSpawn{
        reason: String,
    },
}

impl Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProducerPanicked { message } => write!(f,"producer panicked: {message}"),
            Self::ThreadSpawn { reason } => write!(f,"can not spawn loader thread, reason: {reason}"),
        }
    }
}

impl std::error::Error for LoaderError {}

#[derive(Debug,Clone,PartialEq)]
pub enum WindowError {
    FilterPanicked{
        message: String,
    },
    ThreadSpawn{
        reason: String,
    },
    ResetLost,
    Disposed,
}

impl Display for WindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FilterPanicked { message } => write!(
                f,"filter panicked during reset, previous window kept: {message}"
            ),
            Self::ThreadSpawn { reason } => write!(f,"can not spawn reset thread, reason: {reason}"),
            Self::ResetLost => write!(f,"reset thread terminated without result"),
            Self::Disposed => write!(f,"window is disposed"),
        }
    }
}

impl std::error::Error for WindowError {}

// Текст паники из payload (&str или String)
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
