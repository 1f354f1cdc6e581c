//! Runtime host for the binary.

use std::future::Future;
use std::io;

/// Run `future` on a fresh multi-thread runtime and return its output
/// without waiting for blocking-pool work still in progress.
///
/// Stdin reads stay parked on a blocking thread until a line arrives, so
/// a plain runtime drop would hang an idle console after Ctrl+C.
pub fn block_on_detached<F: Future>(future: F) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}
