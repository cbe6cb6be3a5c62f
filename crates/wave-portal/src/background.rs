//! Runtime for blocking portal calls

use std::io;

use tokio::runtime::{Builder, Runtime};

/// Runs portal calls off the UI thread. Dropping it does not wait for a
/// call still in flight, so closing the window while a wave is mining
/// returns at once.
pub struct BackgroundRuntime {
    runtime: Option<Runtime>,
}

impl BackgroundRuntime {
    pub fn new(worker_threads: usize) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    pub fn spawn_blocking<F>(&self, call: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.runtime {
            Some(runtime) => {
                runtime.spawn_blocking(call);
            }
            None => tracing::warn!("background runtime already shut down"),
        }
    }
}

impl Drop for BackgroundRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
