//! Per-connection handler registry: publication, lookup, shutdown.
//!
//! One [`HandlerRegistry`] exists per connection. Construction resolves
//! the canonical connection handle, walks the handler type's declared
//! capability set through its publish policy, and runs the setup hook.
//! From then on the dispatcher resolves incoming method names against
//! the published table, and at connection teardown calls
//! [`shutdown`](HandlerRegistry::shutdown).
//!
//! # Example
//!
//! ```ignore
//! let mut registry = HandlerRegistry::<SessionHandler>::new(&conn)?;
//!
//! // Dispatcher turn: resolve, then invoke against the instance.
//! let method = registry.resolve(&request.method)?;
//! let result = method.call(registry.handler_mut(), request.params)?;
//! ```

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::connection::{resolve_handle, ConnectionHandle, ConnectionRef};
use crate::error::{Result, WirecallError};
use crate::handler::method::{insert_method, Method, MethodSet};
use crate::handler::policy::PublishPolicy;
use crate::handler::{Handler, SetupContext};

/// Per-connection registry of one handler's published operations.
pub struct HandlerRegistry<H: Handler> {
    /// Canonical handle of the owning connection.
    conn: ConnectionHandle,
    /// The handler type's publish policy, read at construction.
    policy: PublishPolicy,
    /// The instance all published operations run against.
    instance: H,
    /// Published operations by name.
    methods: HashMap<String, Method<H>>,
    /// Set once the teardown hook has run.
    shut: bool,
}

impl<H: Handler> HandlerRegistry<H> {
    /// Construct the registry for `conn` with explicit setup arguments.
    ///
    /// Follows wrapper references inward to the canonical connection
    /// handle, walks the declared capability set through the publish
    /// policy, then runs the setup hook with `args`. The hook sees the
    /// auto-published table and may extend it.
    ///
    /// # Errors
    ///
    /// Fails with [`WirecallError::DuplicateOperation`] when the
    /// declared set or the setup hook publishes one name twice; a setup
    /// hook failure aborts construction unchanged.
    pub fn with_setup(conn: &dyn ConnectionRef, args: H::Setup) -> Result<Self> {
        let policy = H::policy();
        let conn = resolve_handle(conn, policy.unwrap_hops());

        let mut methods = HashMap::new();
        H::publish(&mut MethodSet::new(&policy, &mut methods))?;

        let mut instance = H::default();
        instance.setup(&mut SetupContext::new(&conn, &policy, &mut methods), args)?;

        debug!(
            conn = conn.id(),
            published = methods.len(),
            "handler registry ready"
        );

        Ok(Self {
            conn,
            policy,
            instance,
            methods,
            shut: false,
        })
    }

    /// Construct with default setup arguments.
    pub fn new(conn: &dyn ConnectionRef) -> Result<Self>
    where
        H::Setup: Default,
    {
        Self::with_setup(conn, H::Setup::default())
    }

    /// Register a typed operation after construction.
    ///
    /// Follows the registration contract: reserved names are skipped
    /// silently, an already-published name fails with
    /// [`WirecallError::DuplicateOperation`]. The table is never
    /// silently overwritten.
    pub fn register<T, R, F>(&mut self, name: &str, func: F) -> Result<()>
    where
        T: DeserializeOwned,
        R: Serialize,
        F: Fn(&mut H, T) -> Result<R> + Send + Sync + 'static,
    {
        self.register_method(Method::typed(name, func))
    }

    /// Register a pre-built operation after construction.
    pub fn register_method(&mut self, method: Method<H>) -> Result<()> {
        insert_method(&mut self.methods, &self.policy, method)
    }

    /// Resolve a published operation by name.
    ///
    /// Returns a cheap clone the dispatcher can hold across the actual
    /// invocation. The failure is the one a remote peer can trigger by
    /// itself; translate it into the protocol's "method not found"
    /// reply.
    pub fn resolve(&self, name: &str) -> Result<Method<H>> {
        self.methods.get(name).cloned().ok_or_else(|| {
            WirecallError::UnknownOperation {
                name: name.to_string(),
            }
        })
    }

    /// Resolve `name` and invoke it against the owned instance.
    pub fn invoke(&mut self, name: &str, params: Value) -> Result<Value> {
        let method = self.resolve(name)?;
        method.call(&mut self.instance, params)
    }

    /// Whether `name` is currently published.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Number of published operations.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether nothing is published.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Names currently published, in no particular order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Canonical handle of the owning connection.
    pub fn connection(&self) -> &ConnectionHandle {
        &self.conn
    }

    /// The handler instance.
    pub fn handler(&self) -> &H {
        &self.instance
    }

    /// Mutable access to the handler instance, for calling a resolved
    /// [`Method`] against it.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.instance
    }

    /// Tear the registry down.
    ///
    /// Runs the teardown hook, then withdraws every published
    /// operation. Safe to call more than once: the hook runs only the
    /// first time, the table stays empty. Never fails; afterwards every
    /// resolution yields [`WirecallError::UnknownOperation`].
    pub fn shutdown(&mut self) {
        if !self.shut {
            self.shut = true;
            self.instance.teardown();
            debug!(conn = self.conn.id(), "handler registry shut down");
        }
        self.methods.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NullHandler;
    use serde_json::json;

    /// Publishes a mix of allowed, hidden and reserved names.
    #[derive(Default)]
    struct Inventory {
        fetches: u32,
        torn_down: u32,
    }

    impl Handler for Inventory {
        type Setup = ();

        fn publish(methods: &mut MethodSet<'_, Self>) -> Result<()> {
            methods.method("fetch", |h: &mut Self, _: ()| {
                h.fetches += 1;
                Ok(h.fetches)
            })?;
            methods.method_raw("_hidden", |_h, p| Ok(p))?;
            methods.method_raw("shutdown", |_h, p| Ok(p))?;
            methods.method_raw("fetch2", |_h, p| Ok(p))?;
            Ok(())
        }

        fn teardown(&mut self) {
            self.torn_down += 1;
        }
    }

    /// Declares the same name twice.
    #[derive(Default)]
    struct Doubled;

    impl Handler for Doubled {
        type Setup = ();

        fn publish(methods: &mut MethodSet<'_, Self>) -> Result<()> {
            methods.method_raw("fetch", |_h, p| Ok(p))?;
            methods.method_raw("fetch", |_h, p| Ok(p))?;
            Ok(())
        }
    }

    /// Takes setup arguments and registers one extra operation in the
    /// hook.
    #[derive(Default)]
    struct Flavored {
        flavor: String,
        conn_id: u64,
    }

    impl Handler for Flavored {
        type Setup = String;

        fn publish(methods: &mut MethodSet<'_, Self>) -> Result<()> {
            methods.method("flavor", |h: &mut Self, _: ()| Ok(h.flavor.clone()))
        }

        fn setup(&mut self, cx: &mut SetupContext<'_, Self>, args: String) -> Result<()> {
            self.flavor = args;
            self.conn_id = cx.connection().id();
            cx.register("extra", |_h: &mut Self, _: ()| Ok("extra".to_string()))?;
            Ok(())
        }
    }

    /// Declares operations under a pattern that rejects everything.
    #[derive(Default)]
    struct Denied;

    impl Handler for Denied {
        type Setup = ();

        fn policy() -> PublishPolicy {
            PublishPolicy::deny_all()
        }

        fn publish(methods: &mut MethodSet<'_, Self>) -> Result<()> {
            methods.method_raw("fetch", |_h, p| Ok(p))?;
            methods.method_raw("store", |_h, p| Ok(p))?;
            Ok(())
        }
    }

    fn connected<H: Handler>() -> HandlerRegistry<H>
    where
        H::Setup: Default,
    {
        let (conn, _rx) = ConnectionHandle::channel();
        HandlerRegistry::new(&conn).unwrap()
    }

    #[test]
    fn test_auto_publication_filters_pattern_and_reserved() {
        let registry = connected::<Inventory>();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("fetch"));
        assert!(registry.contains("fetch2"));
        assert!(!registry.contains("_hidden"));
        assert!(!registry.contains("shutdown"));
    }

    #[test]
    fn test_method_names_lists_published_set() {
        let registry = connected::<Inventory>();
        let mut names: Vec<&str> = registry.method_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["fetch", "fetch2"]);
    }

    #[test]
    fn test_duplicate_in_declared_set_aborts_construction() {
        let (conn, _rx) = ConnectionHandle::channel();
        let result = HandlerRegistry::<Doubled>::new(&conn);
        assert!(matches!(
            result,
            Err(WirecallError::DuplicateOperation { name }) if name == "fetch"
        ));
    }

    #[test]
    fn test_resolve_returns_invocable_operation() {
        let mut registry = connected::<Inventory>();

        let method = registry.resolve("fetch").unwrap();
        assert_eq!(method.name(), "fetch");
        let result = method.call(registry.handler_mut(), Value::Null).unwrap();
        assert_eq!(result, json!(1));
        assert_eq!(registry.handler().fetches, 1);
    }

    #[test]
    fn test_invoke_runs_against_owned_instance() {
        let mut registry = connected::<Inventory>();

        assert_eq!(registry.invoke("fetch", Value::Null).unwrap(), json!(1));
        assert_eq!(registry.invoke("fetch", Value::Null).unwrap(), json!(2));
    }

    #[test]
    fn test_resolve_unknown_carries_the_name() {
        let registry = connected::<Inventory>();
        let result = registry.resolve("missing");
        assert!(matches!(
            result,
            Err(WirecallError::UnknownOperation { name }) if name == "missing"
        ));
    }

    #[test]
    fn test_register_after_construction() {
        let mut registry = connected::<Inventory>();

        registry
            .register("stats", |h: &mut Inventory, _: ()| Ok(h.fetches))
            .unwrap();
        assert_eq!(registry.invoke("stats", Value::Null).unwrap(), json!(0));
    }

    #[test]
    fn test_register_duplicate_fails_without_overwrite() {
        let mut registry = connected::<Inventory>();

        let result = registry.register("fetch", |_h: &mut Inventory, _: ()| Ok(0u32));
        assert!(matches!(
            result,
            Err(WirecallError::DuplicateOperation { name }) if name == "fetch"
        ));
        // The original operation still answers.
        assert_eq!(registry.invoke("fetch", Value::Null).unwrap(), json!(1));
    }

    #[test]
    fn test_register_reserved_is_skipped_silently() {
        let mut registry = connected::<Inventory>();

        registry
            .register("resolve", |_h: &mut Inventory, _: ()| Ok(0u32))
            .unwrap();
        registry
            .register("resolve", |_h: &mut Inventory, _: ()| Ok(0u32))
            .unwrap();
        assert!(!registry.contains("resolve"));
    }

    #[test]
    fn test_explicit_registration_ignores_the_pattern() {
        let mut registry = connected::<Inventory>();

        // A name the pattern would reject is fine when registered
        // explicitly.
        registry
            .register("_internal", |_h: &mut Inventory, _: ()| Ok(0u32))
            .unwrap();
        assert!(registry.contains("_internal"));
    }

    #[test]
    fn test_setup_hook_sees_connection_and_registers() {
        let (conn, _rx) = ConnectionHandle::channel();
        let registry =
            HandlerRegistry::<Flavored>::with_setup(&conn, "vanilla".to_string()).unwrap();

        assert_eq!(registry.handler().flavor, "vanilla");
        assert_eq!(registry.handler().conn_id, conn.id());
        assert!(registry.contains("flavor"));
        assert!(registry.contains("extra"));
    }

    #[test]
    fn test_shutdown_clears_and_runs_teardown_once() {
        let mut registry = connected::<Inventory>();

        registry.shutdown();
        registry.shutdown();

        assert!(registry.is_empty());
        assert_eq!(registry.handler().torn_down, 1);
        assert!(matches!(
            registry.resolve("fetch"),
            Err(WirecallError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn test_null_handler_publishes_nothing() {
        let registry = connected::<NullHandler>();

        assert!(registry.is_empty());
        assert!(matches!(
            registry.resolve("anything"),
            Err(WirecallError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn test_deny_all_policy_suppresses_the_declared_set() {
        let registry = connected::<Denied>();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_connection_is_the_resolved_handle() {
        let (conn, mut rx) = ConnectionHandle::channel();
        let registry = HandlerRegistry::<Inventory>::new(&conn).unwrap();

        assert_eq!(registry.connection().id(), conn.id());
        registry.connection().notify("ready", Value::Null).unwrap();
        assert_eq!(rx.try_recv().unwrap().method, "ready");
    }

    /// Wrapper standing between the acceptor and the connection, with
    /// an identity of its own.
    struct Proxy {
        own: ConnectionHandle,
        target: ConnectionHandle,
    }

    impl ConnectionRef for Proxy {
        fn handle(&self) -> ConnectionHandle {
            self.own.clone()
        }

        fn inner(&self) -> Option<&dyn ConnectionRef> {
            Some(&self.target)
        }
    }

    #[test]
    fn test_construction_unwraps_wrapper_references() {
        let (target, mut rx) = ConnectionHandle::channel();
        let (own, _own_rx) = ConnectionHandle::channel();
        let proxy = Proxy {
            own,
            target: target.clone(),
        };

        let registry = HandlerRegistry::<Inventory>::new(&proxy).unwrap();

        // The stored handle is the canonical one behind the wrapper.
        assert_eq!(registry.connection().id(), target.id());
        registry.connection().notify("ready", Value::Null).unwrap();
        assert_eq!(rx.try_recv().unwrap().method, "ready");
    }

    #[test]
    fn test_registry_and_methods_cross_threads() {
        fn is_send<T: Send>() {}
        fn is_sync<T: Sync>() {}

        is_send::<HandlerRegistry<Inventory>>();
        is_send::<Method<Inventory>>();
        is_sync::<Method<Inventory>>();
    }
}
