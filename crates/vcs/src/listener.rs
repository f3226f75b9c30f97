//! File-system listener seam.
//!
//! The bridge does not watch files itself. On activation it asks the host's
//! [`ListenerFactory`] for a listener and keeps the returned handle until
//! deactivation.

use crate::bridge::VcsBridge;
use crate::error::Result;

/// Creates file-system listeners for a bridge.
///
/// Any host context the listener needs is captured by the factory.
pub trait ListenerFactory: Send + Sync {
    /// Attach a new listener to `bridge`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Listener`] (or any other error) if the listener
    /// cannot be set up. The bridge reports it and stays inactive.
    fn attach(&self, bridge: &VcsBridge) -> Result<Box<dyn ListenerHandle>>;
}

/// A live listener owned by the bridge.
pub trait ListenerHandle: Send {
    /// Detach and release the listener. Called exactly once.
    fn dispose(&mut self);
}
