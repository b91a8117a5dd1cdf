//! Published operations and the declaration registrar.
//!
//! A [`Method`] is one published operation: a name plus a callable run
//! against the owning handler instance. Typed operations are wrapped so
//! parameter decoding and result encoding happen at the boundary
//! ([`Method::typed`]), keeping application signatures plain.
//!
//! [`MethodSet`] is the registrar handed to [`Handler::publish`] during
//! registry construction; it walks the declared names through the
//! publish policy.
//!
//! [`Handler::publish`]: crate::Handler::publish

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, WirecallError};
use crate::handler::policy::PublishPolicy;

/// Uniform shape of a published operation.
///
/// Parameters arrive already decoded; the dispatcher owns the wire
/// format on both sides.
pub type MethodFn<H> = Arc<dyn Fn(&mut H, Value) -> Result<Value> + Send + Sync>;

/// One published operation of a handler type.
///
/// Cloning is cheap (name and callable are shared), so a resolved
/// `Method` can be held across the actual invocation without borrowing
/// the registry it came from.
pub struct Method<H> {
    /// Name the operation is published under.
    name: Arc<str>,
    /// The callable, uniform over parameter and result types.
    func: MethodFn<H>,
}

impl<H> Method<H> {
    /// Wrap a typed operation.
    ///
    /// Parameters are deserialized into `T` and the result serialized
    /// back into a value; failure on either side surfaces as
    /// [`WirecallError::Json`].
    pub fn typed<T, R, F>(name: &str, func: F) -> Self
    where
        T: DeserializeOwned,
        R: Serialize,
        F: Fn(&mut H, T) -> Result<R> + Send + Sync + 'static,
    {
        let func: MethodFn<H> = Arc::new(move |handler, params| {
            let input: T = serde_json::from_value(params)?;
            let output = func(handler, input)?;
            Ok(serde_json::to_value(output)?)
        });
        Self {
            name: Arc::from(name),
            func,
        }
    }

    /// Wrap an operation that works on raw decoded values.
    pub fn raw<F>(name: &str, func: F) -> Self
    where
        F: Fn(&mut H, Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    /// Name this operation is published under.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the operation against its handler instance.
    pub fn call(&self, handler: &mut H, params: Value) -> Result<Value> {
        (self.func)(handler, params)
    }
}

// Manual impl: a derive would demand H: Clone, which the shared callable
// does not need.
impl<H> Clone for Method<H> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: self.func.clone(),
        }
    }
}

impl<H> fmt::Debug for Method<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Insert under the registration contract: reserved names are skipped
/// silently (checked before uniqueness), already-published names fail
/// with [`WirecallError::DuplicateOperation`].
pub(crate) fn insert_method<H>(
    table: &mut HashMap<String, Method<H>>,
    policy: &PublishPolicy,
    method: Method<H>,
) -> Result<()> {
    let name = method.name();
    if policy.is_reserved(name) {
        debug!(name, "operation name is reserved, not published");
        return Ok(());
    }
    if table.contains_key(name) {
        return Err(WirecallError::DuplicateOperation {
            name: name.to_string(),
        });
    }
    table.insert(name.to_string(), method);
    Ok(())
}

/// Registrar handed to [`Handler::publish`] during registry
/// construction.
///
/// Walks the declared capability set through the policy: names the
/// pattern rejects are skipped silently, reserved names are skipped
/// silently, and a duplicate among the survivors aborts construction.
///
/// [`Handler::publish`]: crate::Handler::publish
pub struct MethodSet<'a, H> {
    policy: &'a PublishPolicy,
    table: &'a mut HashMap<String, Method<H>>,
}

impl<'a, H> MethodSet<'a, H> {
    pub(crate) fn new(
        policy: &'a PublishPolicy,
        table: &'a mut HashMap<String, Method<H>>,
    ) -> Self {
        Self { policy, table }
    }

    /// Declare a typed operation.
    ///
    /// # Errors
    ///
    /// Fails with [`WirecallError::DuplicateOperation`] when `name` is
    /// already published and neither pattern-rejected nor reserved.
    pub fn method<T, R, F>(&mut self, name: &str, func: F) -> Result<()>
    where
        T: DeserializeOwned,
        R: Serialize,
        F: Fn(&mut H, T) -> Result<R> + Send + Sync + 'static,
    {
        self.insert(Method::typed(name, func))
    }

    /// Declare an operation over raw decoded values.
    pub fn method_raw<F>(&mut self, name: &str, func: F) -> Result<()>
    where
        F: Fn(&mut H, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(Method::raw(name, func))
    }

    fn insert(&mut self, method: Method<H>) -> Result<()> {
        if !self.policy.allows(method.name()) {
            debug!(name = method.name(), "name fails the publish pattern, not published");
            return Ok(());
        }
        insert_method(self.table, self.policy, method)
    }
}
