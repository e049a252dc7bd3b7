use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use jsondispatch::{
    Args, CallError, DeclareService, Dispatcher, ErrorCode, MethodTable, RpcCall, Service,
    ServiceDescriptor, ServiceName, ServiceRegistry, bail_public, serve_stdio,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let registry = ServiceRegistry::builder()
        .register(ServiceDescriptor::of::<HelloService>())?
        .build();
    let dispatcher = Dispatcher::new(registry);
    serve_stdio(&dispatcher, "hello", "").await?;
    Ok(())
}

struct HelloService(MethodTable);

impl Service for HelloService {
    fn resolve(&self, method: &str) -> Option<&RpcCall> {
        self.0.resolve(method)
    }
}
impl DeclareService for HelloService {
    fn declarations() -> Vec<ServiceName> {
        vec![ServiceName::new("hello")]
    }
    fn create() -> Self {
        HelloService(
            MethodTable::new()
                .method("hello", ["request"], hello)
                .method("div", ["a", "b"], div),
        )
    }
}

async fn hello(args: Args) -> Result<Value, CallError> {
    let r: HelloRequest = args.get(0)?;
    Ok(serde_json::to_value(HelloResponse {
        message: format!("Hello, {}!", r.name),
    })?)
}

async fn div(args: Args) -> Result<Value, CallError> {
    let a: f64 = args.get(0)?;
    let b: f64 = args.get(1)?;
    if b == 0.0 {
        bail_public!(ErrorCode::INVALID_PARAMS, "division by zero");
    }
    Ok(Value::from(a / b))
}

#[derive(Debug, Serialize, Deserialize)]
struct HelloRequest {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct HelloResponse {
    message: String,
}
