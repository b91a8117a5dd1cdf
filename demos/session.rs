//! Session demo - one handler type serving a connection.
//!
//! This example demonstrates:
//! - Declaring a handler's published operations with `Handler::publish`
//! - Binding configuration ahead of the connection with `HandlerFactory`
//! - Resolving and invoking operations the way a dispatcher would
//! - Draining the notifications a handler queues for its connection

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wirecall::{
    ConnectionHandle, Handler, HandlerFactory, HandlerRegistry, MethodSet, Result, SetupContext,
    WirecallError,
};

/// Input for the `login` operation.
#[derive(Deserialize)]
struct LoginInput {
    user: String,
}

/// Output of the `login` operation.
#[derive(Serialize)]
struct LoginOutput {
    motd: String,
}

/// Per-connection session state.
#[derive(Default)]
struct Session {
    motd: String,
    user: Option<String>,
    conn: Option<ConnectionHandle>,
}

impl Handler for Session {
    type Setup = String;

    fn publish(methods: &mut MethodSet<'_, Self>) -> Result<()> {
        methods.method("login", |h: &mut Self, input: LoginInput| {
            h.user = Some(input.user.clone());
            if let Some(conn) = &h.conn {
                conn.notify("logged_in", json!({ "user": input.user }))?;
            }
            Ok(LoginOutput {
                motd: h.motd.clone(),
            })
        })?;
        methods.method("whoami", |h: &mut Self, _: ()| {
            Ok(h.user.clone().unwrap_or_else(|| "anonymous".to_string()))
        })?;
        Ok(())
    }

    fn setup(&mut self, cx: &mut SetupContext<'_, Self>, motd: String) -> Result<()> {
        self.motd = motd;
        self.conn = Some(cx.connection().clone());
        Ok(())
    }
}

/// One dispatcher turn: resolve, invoke, translate failures.
fn serve(registry: &mut HandlerRegistry<Session>, method: &str, params: Value) -> Value {
    match registry.invoke(method, params) {
        Ok(result) => json!({ "result": result }),
        Err(WirecallError::UnknownOperation { name }) => {
            json!({ "error": format!("method not found: {name}") })
        }
        Err(other) => json!({ "error": other.to_string() }),
    }
}

fn main() -> Result<()> {
    // One factory can serve every accepted connection.
    let factory = HandlerFactory::<Session>::new("welcome aboard".to_string());

    let (conn, mut outbound) = ConnectionHandle::channel();
    let mut registry = factory.build(&conn)?;

    println!("{}", serve(&mut registry, "whoami", Value::Null));
    println!("{}", serve(&mut registry, "login", json!({ "user": "ada" })));
    println!("{}", serve(&mut registry, "whoami", Value::Null));
    println!("{}", serve(&mut registry, "logout", Value::Null));

    // Handlers queue notifications; the connection's writer drains them.
    while let Ok(msg) = outbound.try_recv() {
        println!("notify -> {}: {}", msg.method, msg.params);
    }

    registry.shutdown();
    Ok(())
}
