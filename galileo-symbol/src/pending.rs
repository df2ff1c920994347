//! Deferred drawing of symbols whose images are not loaded yet.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::image_state::{ImageChangeEvent, ImageState};
use crate::listener::{redraw_on_change, ImageChangeListener, ListenerKey};
use crate::messenger::Messenger;
use crate::symbol::ImageSymbol;

/// Keeps track of the symbols a renderer is waiting for.
///
/// A renderer calls [`prepare`](Self::prepare) for every symbol before drawing it. Symbols that are
/// not loaded yet are subscribed to (once per symbol instance) and asked to load; when their image
/// becomes available the messenger is asked to redraw the map. Symbols shared by many features are
/// subscribed to only once.
///
/// All subscriptions are cancelled when the instance is dropped.
pub struct PendingSymbols {
    messenger: Option<Arc<dyn Messenger>>,
    subscriptions: Mutex<Vec<(Arc<dyn ImageSymbol>, ListenerKey)>>,
}

impl std::fmt::Debug for PendingSymbols {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSymbols")
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl PendingSymbols {
    /// Creates a new instance. If `messenger` is given, it is asked to redraw the map every time a
    /// pending symbol is loaded.
    pub fn new(messenger: Option<Arc<dyn Messenger>>) -> Self {
        Self {
            messenger,
            subscriptions: Mutex::new(vec![]),
        }
    }

    /// Returns true if the symbol can be drawn now.
    ///
    /// Otherwise starts loading the symbol image (if not started yet) and subscribes to its
    /// changes. Symbols that failed to load are never ready.
    pub fn prepare(&self, symbol: &Arc<dyn ImageSymbol>) -> bool {
        match symbol.image_state() {
            ImageState::Loaded => return true,
            ImageState::Error => return false,
            ImageState::Idle | ImageState::Loading => {}
        }

        {
            let mut subscriptions = self.subscriptions.lock();
            if !subscriptions.iter().any(|(s, _)| same_symbol(s, symbol)) {
                let listener: Box<dyn ImageChangeListener> = match &self.messenger {
                    Some(messenger) => redraw_on_change(messenger.clone()),
                    None => Box::new(|_: &ImageChangeEvent| {}),
                };
                let key = symbol.listen_image_change(listener);
                subscriptions.push((symbol.clone(), key));
            }
        }

        symbol.load();

        // The load may have finished before the listener was registered.
        symbol.image_state() == ImageState::Loaded
    }

    /// Cancels subscriptions of the symbols that finished loading (successfully or not). Returns
    /// the number of released subscriptions.
    pub fn release_resolved(&self) -> usize {
        let mut subscriptions = self.subscriptions.lock();
        let count = subscriptions.len();
        subscriptions.retain(|(symbol, key)| {
            if symbol.image_state().is_terminal() {
                symbol.unlisten_image_change(*key);
                false
            } else {
                true
            }
        });

        count - subscriptions.len()
    }

    /// Number of symbols being waited for.
    pub fn pending_count(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

impl Drop for PendingSymbols {
    fn drop(&mut self) {
        for (symbol, key) in self.subscriptions.get_mut().drain(..) {
            symbol.unlisten_image_change(key);
        }
    }
}

fn same_symbol(a: &Arc<dyn ImageSymbol>, b: &Arc<dyn ImageSymbol>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
