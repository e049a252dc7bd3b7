#![cfg(feature = "stdio")]

use std::sync::Arc;

use jsondispatch::{Args, CallError, Dispatcher, MethodTable, ServiceRegistry, serve_lines};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex, split},
    spawn, test,
};

#[derive(Debug, Serialize, Deserialize)]
struct HelloRequest {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct HelloResponse {
    message: String,
}

async fn hello(args: Args) -> Result<Value, CallError> {
    let r: HelloRequest = args.get(0)?;
    Ok(serde_json::to_value(HelloResponse {
        message: format!("Hello, {}!", r.name),
    })?)
}

fn make_dispatcher() -> anyhow::Result<Dispatcher> {
    let registry = ServiceRegistry::builder()
        .insert(
            "hello",
            "",
            Arc::new(MethodTable::new().method("hello", ["request"], hello)),
        )?
        .build();
    Ok(Dispatcher::new(registry))
}

#[test]
async fn serve_lines_answers_requests() -> anyhow::Result<()> {
    let dispatcher = make_dispatcher()?;
    let (server, client) = duplex(1024);
    let (server_r, server_w) = split(server);
    let (client_r, mut client_w) = split(client);

    let server = spawn(async move {
        serve_lines(&dispatcher, "hello", "", BufReader::new(server_r), server_w).await
    });

    client_w
        .write_all(
            concat!(
                r#"{"id":1,"method":"hello","params":[{"name":"Alice"}]}"#,
                "\n",
                "\n",
                r#"{"method":"hello","params":[{"name":"nobody"}]}"#,
                "\n",
                r#"{"id":2,"method":"hello","params":{"request":{"name":"Bob"}}}"#,
                "\n",
            )
            .as_bytes(),
        )
        .await?;
    client_w.shutdown().await?;

    let mut lines = BufReader::new(client_r).lines();
    let first: Value = serde_json::from_str(&lines.next_line().await?.unwrap_or_default())?;
    let second: Value = serde_json::from_str(&lines.next_line().await?.unwrap_or_default())?;
    assert_eq!(first["id"], 1);
    assert_eq!(first["result"]["message"], "Hello, Alice!");
    assert_eq!(second["id"], 2);
    assert_eq!(second["result"]["message"], "Hello, Bob!");

    server.await??;
    assert_eq!(lines.next_line().await?, None);
    Ok(())
}
