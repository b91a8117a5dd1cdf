//! Deferred construction of per-connection registries.
//!
//! A connection acceptor knows the handler's configuration long before
//! any connection exists. [`HandlerFactory`] binds those extra
//! arguments up front and builds an independent registry for every
//! connection it is later given; registries built by the same factory
//! share nothing but the bound arguments.

use crate::connection::ConnectionRef;
use crate::error::Result;
use crate::handler::registry::HandlerRegistry;
use crate::handler::Handler;

/// Deferred constructor with setup arguments bound ahead of the
/// connection.
///
/// # Example
///
/// ```ignore
/// let factory = HandlerFactory::<SessionHandler>::new(config);
///
/// // Later, once per accepted connection:
/// let registry = factory.build(&conn)?;
/// ```
pub struct HandlerFactory<H: Handler> {
    /// Arguments forwarded to every built registry's setup hook.
    args: H::Setup,
}

impl<H: Handler> HandlerFactory<H> {
    /// Bind the extra construction arguments.
    pub fn new(args: H::Setup) -> Self {
        Self { args }
    }

    /// Construct a registry for one connection.
    ///
    /// Every call produces a fresh handler instance with its own
    /// published table; nothing is shared between builds.
    ///
    /// # Errors
    ///
    /// Construction errors propagate unchanged, see
    /// [`HandlerRegistry::with_setup`].
    pub fn build(&self, conn: &dyn ConnectionRef) -> Result<HandlerRegistry<H>> {
        HandlerRegistry::with_setup(conn, self.args.clone())
    }

    /// Convert into a plain constructor closure, for callers that want
    /// a function rather than a value.
    pub fn into_fn(self) -> impl Fn(&dyn ConnectionRef) -> Result<HandlerRegistry<H>> {
        move |conn: &dyn ConnectionRef| HandlerRegistry::with_setup(conn, self.args.clone())
    }
}

// Manual impl: a derive would demand H: Clone, which binding only
// H::Setup does not need.
impl<H: Handler> Clone for HandlerFactory<H> {
    fn clone(&self) -> Self {
        Self {
            args: self.args.clone(),
        }
    }
}

impl<H: Handler> Default for HandlerFactory<H>
where
    H::Setup: Default,
{
    fn default() -> Self {
        Self::new(H::Setup::default())
    }
}
