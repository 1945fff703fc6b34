//! Interface to the external AR tracking subsystem.
//!
//! The tracking subsystem lives outside this crate. The scanner and recovery
//! manager only need a narrow view of it: session state, tracking state, a
//! scalar tracking-quality signal, and the ability to restart it. Anything
//! implementing [`ArSession`] can be injected, which is how tests run the
//! full pipeline without hardware.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of the AR session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Session not yet running
    NotStarted,
    /// Session delivering frames
    Running,
    /// Session paused by the platform (backgrounding, phone call)
    Interrupted,
    /// Session failed, needs restart
    Failed,
}

/// Why tracking is limited, when it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingLimitation {
    /// Too little visual texture in view
    InsufficientFeatures,
    /// Device moving too fast
    ExcessiveMotion,
    /// Tracking still warming up
    Initializing,
}

/// State of world tracking within a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    /// Full-quality tracking
    Normal,
    /// Degraded tracking with a platform-supplied reason
    Limited(TrackingLimitation),
    /// No tracking at all
    Unavailable,
}

/// Error from a session restart request.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Restart rejected or failed at the platform level
    #[error("session restart failed: {0}")]
    RestartFailed(String),
}

/// Narrow handle to the platform AR session.
///
/// Implementations must be safe to share across the scanner's timer and
/// recovery threads.
pub trait ArSession: Send + Sync {
    /// Current session lifecycle state.
    fn state(&self) -> SessionState;

    /// Current tracking state.
    fn tracking_state(&self) -> TrackingState;

    /// Scalar tracking quality in [0, 1], derived per frame by the platform.
    fn tracking_quality(&self) -> f32;

    /// Restart the session, dropping accumulated tracking state.
    fn restart(&self) -> Result<(), SessionError>;
}

impl TrackingState {
    /// True when tracking is degraded or gone.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, TrackingState::Normal)
    }
}
