//! XML-RPC value codec between `serde_json::Value` and the wire format.

use crate::utils::error::{Result, SoftLayerError};
use base64::Engine;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Number, Value};
use std::io::Cursor;

fn xml_error(e: impl std::fmt::Display) -> SoftLayerError {
    SoftLayerError::XmlError {
        message: e.to_string(),
    }
}

/// Decoded `methodResponse`.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Fault { code: String, message: String },
}

struct XmlOut {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::new())),
        }
    }

    fn start(&mut self, tag: &str) -> Result<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new(tag)))
            .map_err(xml_error)
    }

    fn end(&mut self, tag: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(xml_error)
    }

    fn empty(&mut self, tag: &str) -> Result<()> {
        self.writer
            .write_event(Event::Empty(BytesStart::new(tag)))
            .map_err(xml_error)
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)
    }

    fn element(&mut self, tag: &str, text: &str) -> Result<()> {
        self.start(tag)?;
        self.text(text)?;
        self.end(tag)
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner().into_inner()).map_err(xml_error)
    }
}

/// Serialize a `methodCall` document.
pub fn encode_method_call(method: &str, params: &[Value]) -> Result<String> {
    let mut out = XmlOut::new();
    out.writer
        .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
        .map_err(xml_error)?;

    out.start("methodCall")?;
    out.element("methodName", method)?;
    out.start("params")?;
    for param in params {
        out.start("param")?;
        encode_value(&mut out, param)?;
        out.end("param")?;
    }
    out.end("params")?;
    out.end("methodCall")?;

    out.finish()
}

/// Serialize a `methodResponse` document; used by fixtures and tests.
pub fn encode_method_response(response: &MethodResponse) -> Result<String> {
    let mut out = XmlOut::new();
    out.writer
        .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
        .map_err(xml_error)?;
    out.start("methodResponse")?;
    match response {
        MethodResponse::Success(value) => {
            out.start("params")?;
            out.start("param")?;
            encode_value(&mut out, value)?;
            out.end("param")?;
            out.end("params")?;
        }
        MethodResponse::Fault { code, message } => {
            let code = match code.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::from(code.as_str()),
            };
            let mut fault = Map::new();
            fault.insert("faultCode".to_string(), code);
            fault.insert("faultString".to_string(), Value::from(message.as_str()));
            out.start("fault")?;
            encode_value(&mut out, &Value::Object(fault))?;
            out.end("fault")?;
        }
    }
    out.end("methodResponse")?;
    out.finish()
}

fn encode_value(out: &mut XmlOut, value: &Value) -> Result<()> {
    out.start("value")?;
    match value {
        Value::Null => out.empty("nil")?,
        Value::Bool(b) => out.element("boolean", if *b { "1" } else { "0" })?,
        Value::Number(n) => encode_number(out, n)?,
        Value::String(s) => out.element("string", s)?,
        Value::Array(items) => {
            out.start("array")?;
            out.start("data")?;
            for item in items {
                encode_value(out, item)?;
            }
            out.end("data")?;
            out.end("array")?;
        }
        Value::Object(map) => {
            out.start("struct")?;
            for (name, member) in map {
                out.start("member")?;
                out.element("name", name)?;
                encode_value(out, member)?;
                out.end("member")?;
            }
            out.end("struct")?;
        }
    }
    out.end("value")
}

fn encode_number(out: &mut XmlOut, n: &Number) -> Result<()> {
    if let Some(i) = n.as_i64() {
        // XML-RPC 的 int 僅支援 32 位元
        if i32::try_from(i).is_err() {
            return Err(xml_error(format!("int {} exceeds XML-RPC limits", i)));
        }
        out.element("int", &i.to_string())
    } else if n.is_u64() {
        Err(xml_error(format!("int {} exceeds XML-RPC limits", n)))
    } else {
        let f = n.as_f64().unwrap_or_default();
        out.element("double", &f.to_string())
    }
}

/// Minimal element tree built from the reader events.
#[derive(Debug, Default)]
struct Node {
    name: String,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }
}

fn tag_name(e: &BytesStart) -> Result<String> {
    std::str::from_utf8(e.name().as_ref())
        .map(str::to_string)
        .map_err(|_| xml_error("Invalid UTF-8 in tag name"))
}

fn parse_tree(xml: &str) -> Result<Node> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = vec![Node::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Node::named(tag_name(e)?)),
            Ok(Event::Empty(ref e)) => {
                let node = Node::named(tag_name(e)?);
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| xml_error("Unbalanced closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Err(xml_error("Unbalanced closing tag")),
                }
            }
            Ok(Event::Text(ref t)) => {
                let text = t.unescape().map_err(xml_error)?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                let bytes = c.into_inner();
                let text = std::str::from_utf8(&bytes).map_err(xml_error)?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(xml_error(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(xml_error("Unexpected end of document"));
    }
    stack.pop().ok_or_else(|| xml_error("Empty document"))
}

/// Parse a `methodResponse` document.
pub fn decode_method_response(xml: &str) -> Result<MethodResponse> {
    let root = parse_tree(xml)?;
    let response = root
        .child("methodResponse")
        .ok_or_else(|| xml_error("Missing methodResponse element"))?;

    if let Some(fault) = response.child("fault") {
        let value = fault
            .child("value")
            .map(decode_value)
            .transpose()?
            .unwrap_or(Value::Null);
        let code = match value.get("faultCode") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(MethodResponse::Fault { code, message });
    }

    let value = response
        .child("params")
        .and_then(|p| p.child("param"))
        .and_then(|p| p.child("value"))
        .map(decode_value)
        .transpose()?
        .unwrap_or(Value::Null);

    Ok(MethodResponse::Success(value))
}

/// Parse a `methodCall` document into (method, params); used by tests.
pub fn decode_method_call(xml: &str) -> Result<(String, Vec<Value>)> {
    let root = parse_tree(xml)?;
    let call = root
        .child("methodCall")
        .ok_or_else(|| xml_error("Missing methodCall element"))?;
    let method = call
        .child("methodName")
        .map(|n| n.text.trim().to_string())
        .ok_or_else(|| xml_error("Missing methodName element"))?;

    let mut params = Vec::new();
    if let Some(list) = call.child("params") {
        for param in list.children.iter().filter(|c| c.name == "param") {
            if let Some(value) = param.child("value") {
                params.push(decode_value(value)?);
            }
        }
    }
    Ok((method, params))
}

fn decode_value(node: &Node) -> Result<Value> {
    let typed = match node.first_child() {
        Some(typed) => typed,
        // 沒有型別標籤時預設為字串
        None => return Ok(Value::String(node.text.clone())),
    };

    let text = typed.text.as_str();
    match typed.name.as_str() {
        "string" => Ok(Value::String(text.to_string())),
        "int" | "i4" | "i8" => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| xml_error(format!("Invalid integer {:?}: {}", text, e))),
        "boolean" => match text.trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(xml_error(format!("Invalid boolean {:?}", other))),
        },
        "double" => {
            let f: f64 = text
                .trim()
                .parse()
                .map_err(|e| xml_error(format!("Invalid double {:?}: {}", text, e)))?;
            Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
        }
        "dateTime.iso8601" => Ok(Value::String(text.trim().to_string())),
        "base64" => {
            let cleaned: String = text.split_whitespace().collect();
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(cleaned.as_bytes())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok());
            Ok(Value::String(decoded.unwrap_or(cleaned)))
        }
        "nil" => Ok(Value::Null),
        "array" => {
            let mut items = Vec::new();
            if let Some(data) = typed.child("data") {
                for value in data.children.iter().filter(|c| c.name == "value") {
                    items.push(decode_value(value)?);
                }
            }
            Ok(Value::Array(items))
        }
        "struct" => {
            let mut map = Map::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member
                    .child("name")
                    .map(|n| n.text.clone())
                    .ok_or_else(|| xml_error("struct member without name"))?;
                let value = member
                    .child("value")
                    .map(decode_value)
                    .transpose()?
                    .unwrap_or(Value::Null);
                map.insert(name, value);
            }
            Ok(Value::Object(map))
        }
        other => Err(xml_error(format!("Unsupported XML-RPC type: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_method_call() {
        let xml = encode_method_call(
            "getObject",
            &[json!({"headers": {"authenticate": {"username": "u"}}}), json!(5)],
        )
        .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\"?>"));
        assert!(xml.contains("<methodName>getObject</methodName>"));
        assert!(xml.contains("<member><name>headers</name>"));
        assert!(xml.contains("<value><int>5</int></value>"));
    }

    #[test]
    fn test_encode_escapes_text() {
        let xml = encode_method_call("createObject", &[json!("a < b & c")]).unwrap();
        assert!(xml.contains("<string>a &lt; b &amp; c</string>"));
    }

    #[test]
    fn test_encode_rejects_large_int() {
        let err = encode_method_call("getObject", &[json!(5_000_000_000i64)]).unwrap_err();
        assert!(err.to_string().contains("exceeds XML-RPC limits"));
    }

    #[test]
    fn test_call_survives_decoding() {
        let params = vec![
            json!({"headers": {"resultLimit": {"limit": 10, "offset": 0}}}),
            json!({"hostname": "web", "tags": ["a", "b"], "hourly": true, "notes": null, "price": 0.5}),
        ];
        let xml = encode_method_call("editObject", &params).unwrap();
        let (method, decoded) = decode_method_call(&xml).unwrap();
        assert_eq!(method, "editObject");
        assert_eq!(decoded, params);
    }

    #[test]
    fn test_decode_response_types() {
        let xml = r#"<?xml version="1.0" encoding="iso-8859-1"?>
<methodResponse>
<params>
<param>
<value><struct>
<member><name>id</name><value><int>1234</int></value></member>
<member><name>hostname</name><value><string> spaced </string></value></member>
<member><name>bare</name><value>plain</value></member>
<member><name>flag</name><value><boolean>0</boolean></value></member>
<member><name>created</name><value><dateTime.iso8601>2024-01-01T00:00:00-06:00</dateTime.iso8601></value></member>
<member><name>userData</name><value><base64>aGVsbG8=</base64></value></member>
<member><name>tags</name><value><array><data><value><string>x</string></value><value><i4>2</i4></value></data></array></value></member>
<member><name>empty</name><value><nil/></value></member>
<member><name>cost</name><value><double>1.5</double></value></member>
</struct></value>
</param>
</params>
</methodResponse>"#;

        let response = decode_method_response(xml).unwrap();
        assert_eq!(
            response,
            MethodResponse::Success(json!({
                "id": 1234,
                "hostname": " spaced ",
                "bare": "plain",
                "flag": false,
                "created": "2024-01-01T00:00:00-06:00",
                "userData": "hello",
                "tags": ["x", 2],
                "empty": null,
                "cost": 1.5,
            }))
        );
    }

    #[test]
    fn test_decode_fault() {
        let xml = encode_method_response(&MethodResponse::Fault {
            code: "SoftLayer_Exception_ObjectNotFound".to_string(),
            message: "Unable to find object with id of '1'.".to_string(),
        })
        .unwrap();

        match decode_method_response(&xml).unwrap() {
            MethodResponse::Fault { code, message } => {
                assert_eq!(code, "SoftLayer_Exception_ObjectNotFound");
                assert!(message.contains("Unable to find object"));
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_numeric_fault_code() {
        let xml = encode_method_response(&MethodResponse::Fault {
            code: "-32601".to_string(),
            message: "Method not found".to_string(),
        })
        .unwrap();
        assert_eq!(
            decode_method_response(&xml).unwrap(),
            MethodResponse::Fault {
                code: "-32601".to_string(),
                message: "Method not found".to_string()
            }
        );
    }

    #[test]
    fn test_decode_malformed() {
        assert!(decode_method_response("<methodResponse><params>").is_err());
        assert!(decode_method_response("<other/>").is_err());
    }
}
