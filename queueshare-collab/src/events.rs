use std::fmt::Display;

use crossbeam::channel::{Receiver, Sender};

pub type ToastSender = Sender<Toast>;
pub type ToastReceiver = Receiver<Toast>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

/// A dismissible notification for the user.
/// Failed room and playback calls end up here instead of in any state container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn info(message: impl Display) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.to_string(),
        }
    }

    pub fn error(message: impl Display) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.to_string(),
        }
    }
}
