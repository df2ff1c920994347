use std::future::Future;

#[cfg(not(target_arch = "wasm32"))]
use maybe_sync::MaybeSend;

use crate::error::SymbolError;

/// Runs the future in the background.
///
/// On native platforms the future is spawned on the current tokio runtime. If there is none, the
/// future is dropped and an error is returned.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn<T>(future: T) -> Result<(), SymbolError>
where
    T: Future + MaybeSend + 'static,
    T::Output: MaybeSend + 'static,
{
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|err| SymbolError::Generic(format!("no async runtime: {err}")))?;
    handle.spawn(future);
    Ok(())
}

/// Runs the future in the background.
#[cfg(target_arch = "wasm32")]
pub fn spawn<T>(future: T) -> Result<(), SymbolError>
where
    T: Future + 'static,
    T::Output: 'static,
{
    wasm_bindgen_futures::spawn_local(async {
        future.await;
    });
    Ok(())
}
