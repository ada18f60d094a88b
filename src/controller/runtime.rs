use super::binding::SurfaceBindingController;
use super::mailbox::Mailbox;
use super::view::CameraView;
use crate::error::{Result, SnapcamError};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

pub const OWNER_THREAD_NAME: &str = "snapcam-owner";

/// Runs a controller on a dedicated owner thread
pub struct ControllerRuntime {
    mailbox: Mailbox,
    thread: Option<JoinHandle<()>>,
}

impl ControllerRuntime {
    /// Start the owner thread and construct the controller on it.
    /// Blocks until the controller is built, so it must not be called from
    /// inside an async context; use `spawn_blocking` there.
    pub fn spawn<V, F>(build: F) -> Result<Self>
    where
        V: CameraView + 'static,
        F: FnOnce() -> Result<SurfaceBindingController<V>> + Send + 'static,
    {
        let (ready_tx, ready_rx) = oneshot::channel::<Result<Mailbox>>();

        let thread = thread::Builder::new()
            .name(OWNER_THREAD_NAME.to_string())
            .spawn(move || match build() {
                Ok(mut controller) => {
                    if ready_tx.send(Ok(controller.mailbox())).is_err() {
                        return;
                    }
                    controller.run();
                }
                Err(e) => {
                    error!("Failed to build camera controller: {}", e);
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        let mailbox = ready_rx
            .blocking_recv()
            .map_err(|_| SnapcamError::system("Owner thread exited during startup"))??;

        info!("Camera owner thread started");

        Ok(Self {
            mailbox,
            thread: Some(thread),
        })
    }

    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Stop the controller, releasing the camera, and wait for the owner thread
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        if self.mailbox.shutdown().is_err() {
            debug!("Owner thread already gone");
        }

        thread
            .join()
            .map_err(|_| SnapcamError::component("controller_runtime", "owner thread panicked"))?;

        info!("Camera owner thread joined");
        Ok(())
    }
}

impl Drop for ControllerRuntime {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop camera owner thread: {}", e);
        }
    }
}
