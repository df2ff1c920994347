use maybe_sync::{MaybeSend, MaybeSync};

/// Messenger is used to notify the application that the map should be redrawn, e.g. because a
/// symbol image has finished loading.
pub trait Messenger: MaybeSend + MaybeSync {
    /// Requests a redraw of the map.
    fn request_redraw(&self);
}
