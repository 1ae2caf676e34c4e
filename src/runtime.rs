//! Blocking bridge between the synchronous CLI and the async client.

use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::{Builder, Runtime};

// One runtime for the whole process; every command funnels through it, so
// the reqwest connection pool survives across calls within a command.
static RT: Lazy<Runtime> = Lazy::new(|| {
    Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()
        .expect("failed to build tokio runtime")
});

/// Drive `future` to completion on the process-wide runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    RT.block_on(future)
}
