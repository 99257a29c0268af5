//! Containment boundary around the rendering-surface mount point.
//!
//! Errors or panics raised while handing the graph to the renderer switch
//! the boundary into a failed state. While failed, nothing is rendered and
//! the host shows a banner with a manual retry. There is no automatic
//! recovery of the renderer's internal state.

use std::panic::{AssertUnwindSafe, catch_unwind};

/// Message shown in the error banner
pub const DIAGRAM_ERROR_MESSAGE: &str = "Diagram error, please refresh";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiagramError {
    /// Error reported through the renderer's own error channel
    #[error("Rendering surface error {code}: {message}")]
    Surface { code: String, message: String },

    #[error("Rendering surface panicked: {0}")]
    Panic(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoundaryState {
    #[default]
    Healthy,
    Failed(DiagramError),
}

#[derive(Debug, Default)]
pub struct RenderBoundary {
    state: BoundaryState,
    failures: usize,
}

impl RenderBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, BoundaryState::Failed(_))
    }

    /// Total failures contained since creation
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Banner text while failed
    pub fn banner(&self) -> Option<&'static str> {
        self.is_failed().then_some(DIAGRAM_ERROR_MESSAGE)
    }

    /// Run `render` inside the boundary.
    ///
    /// Returns `None` without calling `render` while the boundary is failed,
    /// and `None` when `render` errors or panics.
    pub fn render<T>(&mut self, render: impl FnOnce() -> Result<T, DiagramError>) -> Option<T> {
        if self.is_failed() {
            return None;
        }
        match catch_unwind(AssertUnwindSafe(render)) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(error)) => {
                self.report(error);
                None
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.report(DiagramError::Panic(message));
                None
            }
        }
    }

    /// Error delivered out of band by the renderer's error callback
    pub fn report(&mut self, error: DiagramError) {
        tracing::error!("{}", error);
        self.failures += 1;
        self.state = BoundaryState::Failed(error);
    }

    /// Manual retry from the banner. Returns whether the boundary was failed.
    pub fn retry(&mut self) -> bool {
        let was_failed = self.is_failed();
        self.state = BoundaryState::Healthy;
        was_failed
    }
}
