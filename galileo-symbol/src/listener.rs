//! Subscriptions to image state changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use maybe_sync::{MaybeSend, MaybeSync};
use parking_lot::Mutex;

use crate::image_state::{ImageChangeEvent, ImageState};
use crate::messenger::Messenger;

/// Callback invoked when a symbol image changes its state.
///
/// Any closure `Fn(&ImageChangeEvent)` implements this trait. Context that the listener needs is
/// captured by the closure.
pub trait ImageChangeListener: Fn(&ImageChangeEvent) + MaybeSend + MaybeSync {}
impl<T> ImageChangeListener for T where T: Fn(&ImageChangeEvent) + MaybeSend + MaybeSync {}

/// Handle of a listener registration, used to cancel it.
///
/// Keys are unique within the process, so a key issued by one symbol never cancels a listener of
/// another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

impl ListenerKey {
    fn next() -> Self {
        static NEXT_KEY: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// Image state machine with a list of change listeners.
///
/// State and listeners are guarded together, so a listener is either registered before a
/// transition (and notified exactly once when the image reaches `Loaded` or `Error`) or it is
/// registered after it, in which case [`state`](Self::state) already returns the terminal value.
///
/// Entering `Loading` does not notify listeners.
pub struct ImageChangeNotifier {
    inner: Mutex<NotifierState>,
}

struct NotifierState {
    state: ImageState,
    listeners: Vec<(ListenerKey, Box<dyn ImageChangeListener>)>,
}

impl std::fmt::Debug for ImageChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ImageChangeNotifier")
            .field("state", &inner.state)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl Default for ImageChangeNotifier {
    fn default() -> Self {
        Self::new(ImageState::Idle)
    }
}

impl ImageChangeNotifier {
    /// Creates a notifier in the given state.
    pub fn new(state: ImageState) -> Self {
        Self {
            inner: Mutex::new(NotifierState {
                state,
                listeners: vec![],
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> ImageState {
        self.inner.lock().state
    }

    /// Moves `Idle` to `Loading`.
    ///
    /// Returns false and changes nothing if the state is not `Idle`. The caller that gets `true`
    /// is the one responsible for acquiring the resource.
    pub fn begin_loading(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != ImageState::Idle {
            return false;
        }

        inner.state = ImageState::Loading;
        true
    }

    /// Moves the state machine to `next` and notifies listeners if `next` is terminal.
    ///
    /// Invalid transitions are ignored and `false` is returned. After a terminal transition all
    /// listeners are dropped, since no further notifications can happen.
    pub fn transition(&self, next: ImageState) -> bool {
        let listeners = {
            let mut inner = self.inner.lock();
            if !inner.state.can_transition_to(next) {
                log::warn!(
                    "Ignoring invalid image state transition {:?} -> {next:?}",
                    inner.state
                );
                return false;
            }

            inner.state = next;
            if !next.is_terminal() {
                return true;
            }

            std::mem::take(&mut inner.listeners)
        };

        // Listeners are called without the lock held, so they can query the state or unsubscribe.
        let event = ImageChangeEvent { state: next };
        for (_, listener) in listeners {
            listener(&event);
        }

        true
    }

    /// Registers a listener.
    ///
    /// If the state is already terminal, the listener would never be called, so it is dropped right
    /// away. The returned key is still valid for [`unlisten`](Self::unlisten).
    pub fn listen(&self, listener: Box<dyn ImageChangeListener>) -> ListenerKey {
        let key = ListenerKey::next();
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            log::trace!(
                "Listener {key:?} registered in terminal state {:?}",
                inner.state
            );
        } else {
            inner.listeners.push((key, listener));
        }

        key
    }

    /// Cancels the listener registration. Returns false if no listener with the key is
    /// registered.
    pub fn unlisten(&self, key: ListenerKey) -> bool {
        let mut inner = self.inner.lock();
        let count = inner.listeners.len();
        inner.listeners.retain(|(k, _)| *k != key);
        inner.listeners.len() != count
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

/// Creates a listener that asks the `messenger` to redraw the map once an image is loaded.
pub fn redraw_on_change(messenger: Arc<dyn Messenger>) -> Box<dyn ImageChangeListener> {
    Box::new(move |event: &ImageChangeEvent| {
        if event.state == ImageState::Loaded {
            messenger.request_redraw();
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::Barrier;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, Box<dyn ImageChangeListener>) {
        let count = Arc::new(AtomicUsize::new(0));
        let listener_count = count.clone();
        let listener: Box<dyn ImageChangeListener> = Box::new(move |_: &ImageChangeEvent| {
            listener_count.fetch_add(1, Ordering::SeqCst);
        });

        (count, listener)
    }

    #[test]
    fn begin_loading_only_once() {
        let notifier = ImageChangeNotifier::default();
        assert!(notifier.begin_loading());
        assert_eq!(notifier.state(), ImageState::Loading);
        assert!(!notifier.begin_loading());
        assert_eq!(notifier.state(), ImageState::Loading);
    }

    #[test]
    fn terminal_transition_notifies_once() {
        let notifier = ImageChangeNotifier::default();
        let (first, first_listener) = counter();
        let (second, second_listener) = counter();
        notifier.listen(first_listener);
        notifier.listen(second_listener);

        notifier.begin_loading();
        assert_eq!(first.load(Ordering::SeqCst), 0);

        assert!(notifier.transition(ImageState::Loaded));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.listener_count(), 0);

        assert!(!notifier.transition(ImageState::Error));
        assert_eq!(notifier.state(), ImageState::Loaded);
        assert_eq!(first.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_transition_is_ignored() {
        let notifier = ImageChangeNotifier::default();
        let (count, listener) = counter();
        notifier.listen(listener);

        assert!(!notifier.transition(ImageState::Loaded));
        assert_eq!(notifier.state(), ImageState::Idle);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unlisten_stops_notifications() {
        let notifier = ImageChangeNotifier::default();
        let (count, listener) = counter();
        let key = notifier.listen(listener);

        assert!(notifier.unlisten(key));
        assert!(!notifier.unlisten(key));

        notifier.begin_loading();
        notifier.transition(ImageState::Error);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unlisten_unknown_key_is_noop() {
        let other = ImageChangeNotifier::default();
        let (_, other_listener) = counter();
        let foreign_key = other.listen(other_listener);

        let notifier = ImageChangeNotifier::default();
        let (count, listener) = counter();
        notifier.listen(listener);

        assert!(!notifier.unlisten(foreign_key));
        assert_eq!(notifier.listener_count(), 1);

        notifier.begin_loading();
        notifier.transition(ImageState::Loaded);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listen_after_terminal_state_never_fires() {
        let notifier = ImageChangeNotifier::new(ImageState::Error);
        let (count, listener) = counter();
        let key = notifier.listen(listener);

        assert_eq!(notifier.state(), ImageState::Error);
        assert_eq!(notifier.listener_count(), 0);
        assert!(!notifier.unlisten(key));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_can_read_state_and_unsubscribe() {
        let notifier = Arc::new(ImageChangeNotifier::default());
        let observed = Arc::new(Mutex::new(None));

        let notifier_clone = notifier.clone();
        let observed_clone = observed.clone();
        let key = Arc::new(Mutex::new(None::<ListenerKey>));
        let key_clone = key.clone();
        let registered = notifier.listen(Box::new(move |_: &ImageChangeEvent| {
            *observed_clone.lock() = Some(notifier_clone.state());
            if let Some(key) = *key_clone.lock() {
                notifier_clone.unlisten(key);
            }
        }));
        *key.lock() = Some(registered);

        notifier.begin_loading();
        notifier.transition(ImageState::Loaded);
        assert_eq!(*observed.lock(), Some(ImageState::Loaded));
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct Registration {
        fired: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
        state_after_listen: ImageState,
    }

    #[test]
    fn concurrent_listen_and_load_notifies_at_most_once() {
        const ROUNDS: usize = 100;
        const LISTENING_THREADS: usize = 4;
        const LISTENERS_PER_THREAD: usize = 16;

        for _ in 0..ROUNDS {
            let notifier = ImageChangeNotifier::default();
            let barrier = Barrier::new(LISTENING_THREADS + 1);

            let registrations: Vec<Registration> = std::thread::scope(|scope| {
                let listening: Vec<_> = (0..LISTENING_THREADS)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            (0..LISTENERS_PER_THREAD)
                                .map(|_| {
                                    let fired = Arc::new(AtomicUsize::new(0));
                                    let dropped = Arc::new(AtomicBool::new(false));
                                    let flag = DropFlag(dropped.clone());
                                    let listener_fired = fired.clone();
                                    notifier.listen(Box::new(move |event: &ImageChangeEvent| {
                                        let _flag = &flag;
                                        assert_eq!(event.state, ImageState::Loaded);
                                        listener_fired.fetch_add(1, Ordering::SeqCst);
                                    }));

                                    Registration {
                                        fired,
                                        dropped,
                                        state_after_listen: notifier.state(),
                                    }
                                })
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();

                scope.spawn(|| {
                    barrier.wait();
                    assert!(notifier.begin_loading());
                    assert!(notifier.transition(ImageState::Loaded));
                });

                listening
                    .into_iter()
                    .flat_map(|handle| handle.join().expect("listening thread panicked"))
                    .collect()
            });

            assert_eq!(notifier.state(), ImageState::Loaded);
            assert_eq!(notifier.listener_count(), 0);
            for registration in registrations {
                let fired = registration.fired.load(Ordering::SeqCst);
                assert!(fired <= 1);
                assert!(registration.dropped.load(Ordering::SeqCst));
                if fired == 0 {
                    assert_eq!(registration.state_after_listen, ImageState::Loaded);
                }
            }
        }
    }

    #[test]
    fn redraw_requested_on_load() {
        struct CountingMessenger(AtomicUsize);
        impl Messenger for CountingMessenger {
            fn request_redraw(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let messenger = Arc::new(CountingMessenger(AtomicUsize::new(0)));
        let listener = redraw_on_change(messenger.clone());
        listener(&ImageChangeEvent {
            state: ImageState::Error,
        });
        assert_eq!(messenger.0.load(Ordering::SeqCst), 0);
        listener(&ImageChangeEvent {
            state: ImageState::Loaded,
        });
        assert_eq!(messenger.0.load(Ordering::SeqCst), 1);
    }
}
