//! # wirecall
//!
//! Handler capability registry for wirecall RPC connections.
//!
//! This crate is the seam between application code and the connection
//! machinery. The surrounding dispatcher decodes an incoming request
//! into a method name plus parameters; a [`HandlerRegistry`] decides
//! which operations of a connection-bound [`Handler`] are remotely
//! callable and resolves names to invocable [`Method`]s. Framing,
//! request correlation and sockets live elsewhere; nothing here touches
//! the wire.
//!
//! ## Architecture
//!
//! ```text
//! request ──► dispatcher ──► registry.resolve(name) ──► Method
//!                │                                        │
//!                └───── call against the handler ◄────────┘
//! ```
//!
//! A handler type declares its remotely callable operations once
//! ([`Handler::publish`]); the registry filters that declared set
//! through the type's [`PublishPolicy`] (name pattern plus exclusion
//! set), so lifecycle machinery never leaks onto the wire.
//!
//! ## Example
//!
//! ```
//! use wirecall::{ConnectionHandle, Handler, HandlerRegistry, MethodSet, Result};
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! impl Handler for Greeter {
//!     type Setup = ();
//!
//!     fn publish(methods: &mut MethodSet<'_, Self>) -> Result<()> {
//!         methods.method("greet", |_h: &mut Self, name: String| {
//!             Ok(format!("hello, {name}"))
//!         })
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let (conn, _rx) = ConnectionHandle::channel();
//! let mut registry = HandlerRegistry::<Greeter>::new(&conn)?;
//! let reply = registry.invoke("greet", "world".into())?;
//! assert_eq!(reply, "hello, world");
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod handler;

pub use connection::{ConnectionHandle, ConnectionRef, Outbound};
pub use error::{Result, WirecallError};
pub use handler::{
    Handler, HandlerFactory, HandlerRegistry, Method, MethodFn, MethodSet, NullHandler,
    PublishPolicy, SetupContext,
};
