use crate::{Batch, ErrorCode, ErrorObject, Request, RequestId, Response};
use serde_json::{Value, json};

#[test]
fn request_deserialize() -> anyhow::Result<()> {
    let input = r#"{"jsonrpc":"2.0","id":1,"method":"test_method","params":{"param1":"value1"}}"#;
    let m = serde_json::from_str::<Request>(input)?;
    assert_eq!(m.jsonrpc.as_deref(), Some("2.0"));
    assert_eq!(m.id, Some(RequestId::Number(1)));
    assert_eq!(m.method, "test_method");
    assert_eq!(to_value(&m)?, json!({"param1": "value1"}));
    assert!(!m.is_notification());
    Ok(())
}

#[test]
fn request_deserialize_no_params() -> anyhow::Result<()> {
    let input = r#"{"id":"a","method":"test_method"}"#;
    let m = serde_json::from_str::<Request>(input)?;
    assert_eq!(m.jsonrpc, None);
    assert_eq!(m.id, Some(RequestId::from("a")));
    assert_eq!(to_value(&m)?, Value::Null);
    Ok(())
}

#[test]
fn request_deserialize_notification() -> anyhow::Result<()> {
    let input = r#"{"jsonrpc":"2.0","method":"test_method","params":[1,2]}"#;
    let m = serde_json::from_str::<Request>(input)?;
    assert_eq!(m.id, None);
    assert!(m.is_notification());
    assert_eq!(to_value(&m)?, json!([1, 2]));
    Ok(())
}

#[test]
fn request_deserialize_null_id_is_notification() -> anyhow::Result<()> {
    let input = r#"{"id":null,"method":"test_method"}"#;
    let m = serde_json::from_str::<Request>(input)?;
    assert!(m.is_notification());
    Ok(())
}

#[test]
fn request_deserialize_escaped() -> anyhow::Result<()> {
    let input = r#"{"jsonrpc":"2.0","id":1.5,"method":"あ"}"#;
    let m = serde_json::from_str::<Request>(input)?;
    assert_eq!(m.id, Some(RequestId::Float(1.5)));
    assert_eq!(m.method, "あ");
    Ok(())
}

#[test]
fn request_deserialize_missing_method() {
    let input = r#"{"id":1,"params":[]}"#;
    assert!(serde_json::from_str::<Request>(input).is_err());
}

#[test]
fn response_serialize_result() -> anyhow::Result<()> {
    let r = Response::success(RequestId::Number(1), json!(5));
    assert_eq!(serde_json::to_string(&r)?, r#"{"id":1,"result":5}"#);
    Ok(())
}

#[test]
fn response_serialize_null_result() -> anyhow::Result<()> {
    let mut r = Response::success(RequestId::from("x"), Value::Null);
    r.jsonrpc = Some("2.0".to_string());
    assert_eq!(
        serde_json::to_string(&r)?,
        r#"{"jsonrpc":"2.0","id":"x","result":null}"#
    );
    Ok(())
}

#[test]
fn response_serialize_error() -> anyhow::Result<()> {
    let r = Response::error(
        RequestId::Number(7),
        ErrorObject::from(ErrorCode::METHOD_NOT_FOUND),
    );
    assert_eq!(
        serde_json::to_value(&r)?,
        json!({"id":7,"error":{"code":-32601,"message":"Method not found"}})
    );
    Ok(())
}

#[test]
fn response_roundtrip_error() -> anyhow::Result<()> {
    let input = r#"{"id":2,"error":{"code":-32602,"message":"Invalid params","data":{"a":1}}}"#;
    let r = serde_json::from_str::<Response>(input)?;
    assert_eq!(r.id, RequestId::Number(2));
    let e = r.error_object().expect("error outcome");
    assert_eq!(e.code, ErrorCode::INVALID_PARAMS);
    assert_eq!(e.data, Some(json!({"a": 1})));
    assert_eq!(r.result(), None);
    Ok(())
}

#[test]
fn batch_serialize_shape() -> anyhow::Result<()> {
    let single = Batch::Single(Response::success(RequestId::Number(1), json!(true)));
    assert_eq!(serde_json::to_value(&single)?, json!({"id":1,"result":true}));

    let many = Batch::Many(vec![Response::success(RequestId::Number(1), json!(true))]);
    assert_eq!(serde_json::to_value(&many)?, json!([{"id":1,"result":true}]));
    Ok(())
}

#[test]
fn batch_iter() {
    let items: Vec<_> = Batch::Many(vec![1, 2, 3]).into_iter().collect();
    assert_eq!(items, [1, 2, 3]);
    let items: Vec<_> = Batch::Single(4).into_iter().collect();
    assert_eq!(items, [4]);
    assert!(Batch::<i32>::Many(Vec::new()).is_empty());
}

#[test]
fn error_code_messages() {
    assert_eq!(ErrorCode::PARSE_ERROR.message(), "Parse error");
    assert_eq!(ErrorCode(-32050).message(), "Server error");
    assert_eq!(ErrorCode(12).message(), "Unknown error");
    assert_eq!(ErrorCode::INTERNAL_ERROR.to_string(), "-32603");
}

fn to_value(m: &Request) -> Result<Value, serde_json::Error> {
    match &m.params {
        Some(v) => serde_json::from_str(v.get()),
        None => Ok(Value::Null),
    }
}
