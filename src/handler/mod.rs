//! Handler module - capability declaration and per-connection registries.
//!
//! Provides:
//! - [`Handler`] - declares what a connection-bound type publishes
//! - [`HandlerRegistry`] - per-connection table of published operations
//! - [`HandlerFactory`] - deferred construction with bound arguments
//! - [`PublishPolicy`] - pattern plus exclusion set gating publication
//!
//! # Example
//!
//! ```
//! use wirecall::{ConnectionHandle, Handler, HandlerRegistry, MethodSet, Result};
//!
//! #[derive(Default)]
//! struct Counter {
//!     count: u64,
//! }
//!
//! impl Handler for Counter {
//!     type Setup = ();
//!
//!     fn publish(methods: &mut MethodSet<'_, Self>) -> Result<()> {
//!         methods.method("bump", |h: &mut Self, n: u64| {
//!             h.count += n;
//!             Ok(h.count)
//!         })
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let (conn, _rx) = ConnectionHandle::channel();
//! let mut registry = HandlerRegistry::<Counter>::new(&conn)?;
//! assert_eq!(registry.invoke("bump", 2u64.into())?, 2);
//! # Ok(())
//! # }
//! ```

mod factory;
mod method;
mod policy;
mod registry;

pub use factory::HandlerFactory;
pub use method::{Method, MethodFn, MethodSet};
pub use policy::{PublishPolicy, DEFAULT_UNWRAP_HOPS, RESERVED_NAMES};
pub use registry::HandlerRegistry;

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::connection::ConnectionHandle;
use crate::error::Result;

/// Capability declaration for a connection-bound handler type.
///
/// Implement this for the object that backs one side of a connection.
/// The declared set in [`publish`](Handler::publish) is the whole story
/// of what the type exposes: an operation is remotely callable exactly
/// when it is declared there (and passes the [`PublishPolicy`]) or is
/// registered explicitly later.
///
/// One instance exists per registry, so per-connection state lives in
/// plain fields with no synchronization.
pub trait Handler: Default + Send + 'static {
    /// Extra construction arguments a factory binds ahead of the
    /// connection reference.
    type Setup: Clone + Send + 'static;

    /// Publish policy for this handler type.
    ///
    /// Read once per registry construction, never reconfigured
    /// afterwards.
    fn policy() -> PublishPolicy {
        PublishPolicy::standard()
    }

    /// Declare the operations this handler publishes.
    ///
    /// Called once per registry construction. Names the policy's
    /// pattern rejects or exclusion set contains are skipped silently;
    /// a duplicate among the survivors aborts construction.
    fn publish(methods: &mut MethodSet<'_, Self>) -> Result<()>;

    /// Hook running after auto-publication, with the extra construction
    /// arguments.
    ///
    /// Override it to seed per-connection state, keep a clone of the
    /// [`ConnectionHandle`], or register operations beyond the declared
    /// set. The default does nothing.
    fn setup(&mut self, cx: &mut SetupContext<'_, Self>, args: Self::Setup) -> Result<()> {
        let _ = (cx, args);
        Ok(())
    }

    /// Hook running when the owning connection shuts down, before the
    /// published operations are withdrawn. The default does nothing.
    fn teardown(&mut self) {}
}

/// What the [`setup`](Handler::setup) hook sees during registry
/// construction.
///
/// Gives access to the resolved canonical connection handle and to
/// explicit registration. Registration here follows the registration
/// contract: reserved names are skipped silently, duplicates fail
/// immediately. The publish pattern is not consulted; it gates only the
/// declared set.
pub struct SetupContext<'a, H> {
    conn: &'a ConnectionHandle,
    policy: &'a PublishPolicy,
    table: &'a mut HashMap<String, Method<H>>,
}

impl<'a, H> SetupContext<'a, H> {
    pub(crate) fn new(
        conn: &'a ConnectionHandle,
        policy: &'a PublishPolicy,
        table: &'a mut HashMap<String, Method<H>>,
    ) -> Self {
        Self { conn, policy, table }
    }

    /// Canonical handle of the connection this handler belongs to.
    pub fn connection(&self) -> &ConnectionHandle {
        self.conn
    }

    /// Register a typed operation beyond the declared set.
    ///
    /// # Errors
    ///
    /// Fails with
    /// [`WirecallError::DuplicateOperation`](crate::WirecallError::DuplicateOperation)
    /// when `name` is already published.
    pub fn register<T, R, F>(&mut self, name: &str, func: F) -> Result<()>
    where
        T: DeserializeOwned,
        R: Serialize,
        F: Fn(&mut H, T) -> Result<R> + Send + Sync + 'static,
    {
        self.register_method(Method::typed(name, func))
    }

    /// Register a pre-built operation beyond the declared set.
    pub fn register_method(&mut self, method: Method<H>) -> Result<()> {
        method::insert_method(self.table, self.policy, method)
    }
}

/// Handler that publishes nothing.
///
/// Use it for connections that must accept no incoming calls; every
/// resolution fails with
/// [`WirecallError::UnknownOperation`](crate::WirecallError::UnknownOperation)
/// and the dispatcher answers accordingly.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NullHandler;

impl Handler for NullHandler {
    type Setup = ();

    fn publish(_methods: &mut MethodSet<'_, Self>) -> Result<()> {
        Ok(())
    }
}
