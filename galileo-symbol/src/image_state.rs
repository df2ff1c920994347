//! Load state of a symbol image.

use serde::{Deserialize, Serialize};

/// State of the image resource of a symbol.
///
/// A load attempt goes through the states in one direction only:
///
/// ```text
/// Idle --load()--> Loading --success--> Loaded
///                          \--failure--> Error
/// ```
///
/// `Loaded` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageState {
    /// Loading has not been requested yet.
    Idle,
    /// The resource is being acquired.
    Loading,
    /// The image and its geometry are available.
    Loaded,
    /// The resource could not be acquired.
    Error,
}

impl ImageState {
    /// Returns true for `Loaded` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Loaded | Self::Error)
    }

    /// Returns true if a load attempt may move from `self` to `next`.
    pub fn can_transition_to(self, next: ImageState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Loading) | (Self::Loading, Self::Loaded) | (Self::Loading, Self::Error)
        )
    }
}

/// Notification sent to image change listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageChangeEvent {
    /// State the image has moved into.
    pub state: ImageState,
}
