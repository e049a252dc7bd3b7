use std::borrow::Cow;

use serde_json::{json, value::RawValue};

use super::strip_trailing_commas;
use crate::{
    Batch, Codec, Error, ErrorCode, ErrorObject, JsonCodec, ParamDescriptor, RequestId, Response,
};

fn params(names: &[&str]) -> Vec<ParamDescriptor> {
    names.iter().copied().map(ParamDescriptor::from).collect()
}

fn raw(s: &str) -> Box<RawValue> {
    RawValue::from_string(s.to_string()).expect("valid json")
}

#[test]
fn strip_nothing_borrows() {
    let input = br#"{"a":[1,2],"b":"x,]"}"#;
    assert!(matches!(strip_trailing_commas(input), Cow::Borrowed(_)));
}

#[test]
fn strip_trailing_commas_outside_strings() {
    let input = br#"[{"a":[1,2, ],"b":"x,}",} ,]"#;
    let out = strip_trailing_commas(input);
    assert_eq!(&*out, br#"[{"a":[1,2 ],"b":"x,}"} ]"#);
}

#[test]
fn strip_respects_escaped_quotes() {
    let input = br#"{"a":"q\",]",}"#;
    let out = strip_trailing_commas(input);
    assert_eq!(&*out, br#"{"a":"q\",]"}"#);
}

#[test]
fn decode_single() -> anyhow::Result<()> {
    let b = JsonCodec.decode_requests(br#" {"id":1,"method":"add","params":[2,3]}"#)?;
    let Batch::Single(r) = b else {
        panic!("expected single request");
    };
    assert_eq!(r.id, Some(RequestId::Number(1)));
    assert_eq!(r.method, "add");
    Ok(())
}

#[test]
fn decode_batch() -> anyhow::Result<()> {
    let b = JsonCodec.decode_requests(
        b"\n[{\"id\":1,\"method\":\"a\"},{\"method\":\"b\",\"params\":[\"hi\",],},]",
    )?;
    assert!(b.is_batch());
    let methods: Vec<_> = b.into_iter().map(|r| r.method).collect();
    assert_eq!(methods, ["a", "b"]);
    Ok(())
}

#[test]
fn decode_empty_batch() -> anyhow::Result<()> {
    let b = JsonCodec.decode_requests(b"[]")?;
    assert!(b.is_batch());
    assert!(b.is_empty());
    Ok(())
}

#[test]
fn decode_malformed() {
    for input in [&b"aaa"[..], b"", b"{\"id\":1}", b"[1,2]"] {
        let e = JsonCodec.decode_requests(input).unwrap_err();
        assert!(matches!(e, Error::PayloadDecode(_)), "{e}");
    }
}

#[test]
fn arguments_positional() -> anyhow::Result<()> {
    let args = JsonCodec.decode_arguments(Some(&*raw("[2,3]")), &params(&["a", "b"]))?;
    assert_eq!(args, [json!(2), json!(3)]);
    Ok(())
}

#[test]
fn arguments_named_in_declaration_order() -> anyhow::Result<()> {
    let args =
        JsonCodec.decode_arguments(Some(&*raw(r#"{"b":3,"a":2}"#)), &params(&["a", "b"]))?;
    assert_eq!(args, [json!(2), json!(3)]);
    Ok(())
}

#[test]
fn arguments_named_missing_and_unknown() -> anyhow::Result<()> {
    let p = params(&["a", "b"]);
    let missing = JsonCodec.decode_arguments(Some(&*raw(r#"{"a":2}"#)), &p)?;
    assert_eq!(missing.len(), 1);
    let e = JsonCodec
        .decode_arguments(Some(&*raw(r#"{"a":2,"b":3,"c":4}"#)), &p)
        .unwrap_err();
    assert!(matches!(e, Error::ParamsDecode(_)), "{e}");
    Ok(())
}

#[test]
fn arguments_named_unknown_does_not_fill_missing() {
    let e = JsonCodec
        .decode_arguments(Some(&*raw(r#"{"a":10,"typo":3}"#)), &params(&["a", "b"]))
        .unwrap_err();
    assert!(e.to_string().contains("typo"), "{e}");
    assert_eq!(e.code(), ErrorCode::INVALID_PARAMS);
}

#[test]
fn arguments_absent() -> anyhow::Result<()> {
    assert!(JsonCodec.decode_arguments(None, &params(&["a"]))?.is_empty());
    Ok(())
}

#[test]
fn encode_minimal_escaping() -> anyhow::Result<()> {
    let r = Batch::Single(Response::success(
        RequestId::Number(1),
        json!("あ<>&'\"\n"),
    ));
    let bytes = JsonCodec.encode_responses(&r)?;
    assert_eq!(
        String::from_utf8(bytes)?,
        r#"{"id":1,"result":"あ<>&'\"\n"}"#
    );
    Ok(())
}

#[test]
fn encode_batch() -> anyhow::Result<()> {
    let r = Batch::Many(vec![
        Response::success(RequestId::Number(1), json!(5)),
        Response::error(
            RequestId::from("x"),
            ErrorObject::from(ErrorCode::METHOD_NOT_FOUND),
        ),
    ]);
    let bytes = JsonCodec.encode_responses(&r)?;
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&bytes)?,
        json!([
            {"id":1,"result":5},
            {"id":"x","error":{"code":-32601,"message":"Method not found"}}
        ])
    );
    Ok(())
}
