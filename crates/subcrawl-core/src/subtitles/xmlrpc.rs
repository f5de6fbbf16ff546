//! Minimal XML-RPC encoding for method calls and decoding for method responses.

use super::service::RemoteError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::String(s.to_string())
    }

    pub fn structure<'a>(members: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Value::Struct(
            members
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integers, or strings holding an integer (the service sends ids both ways).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

// ── Encoding ─────────────────────────────────────────────────────

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn emit<'a>(writer: &mut XmlWriter, event: Event<'a>) -> Result<(), RemoteError> {
    writer
        .write_event(event)
        .map_err(|e| RemoteError::Other(format!("xml encoding failed: {}", e)))
}

fn open(writer: &mut XmlWriter, tag: &str) -> Result<(), RemoteError> {
    emit(writer, Event::Start(BytesStart::new(tag)))
}

fn close(writer: &mut XmlWriter, tag: &str) -> Result<(), RemoteError> {
    emit(writer, Event::End(BytesEnd::new(tag)))
}

fn text_element(writer: &mut XmlWriter, tag: &str, text: &str) -> Result<(), RemoteError> {
    open(writer, tag)?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    close(writer, tag)
}

fn write_value(writer: &mut XmlWriter, value: &Value) -> Result<(), RemoteError> {
    open(writer, "value")?;
    match value {
        Value::Int(i) => text_element(writer, "int", &i.to_string())?,
        Value::Bool(b) => text_element(writer, "boolean", if *b { "1" } else { "0" })?,
        Value::Double(d) => text_element(writer, "double", &d.to_string())?,
        Value::String(s) => text_element(writer, "string", s)?,
        Value::Array(items) => {
            open(writer, "array")?;
            open(writer, "data")?;
            for item in items {
                write_value(writer, item)?;
            }
            close(writer, "data")?;
            close(writer, "array")?;
        }
        Value::Struct(members) => {
            open(writer, "struct")?;
            for (name, member) in members {
                open(writer, "member")?;
                text_element(writer, "name", name)?;
                write_value(writer, member)?;
                close(writer, "member")?;
            }
            close(writer, "struct")?;
        }
        Value::Nil => emit(writer, Event::Empty(BytesStart::new("nil")))?,
    }
    close(writer, "value")
}

pub fn encode_call(method: &str, params: &[Value]) -> Result<String, RemoteError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    open(&mut writer, "methodCall")?;
    text_element(&mut writer, "methodName", method)?;
    open(&mut writer, "params")?;
    for param in params {
        open(&mut writer, "param")?;
        write_value(&mut writer, param)?;
        close(&mut writer, "param")?;
    }
    close(&mut writer, "params")?;
    close(&mut writer, "methodCall")?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| RemoteError::Other(e.to_string()))
}

// ── Decoding ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Default::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn malformed(reason: impl std::fmt::Display) -> RemoteError {
    RemoteError::Malformed(reason.to_string())
}

fn parse_tree(xml: &str) -> Result<Element, RemoteError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack = vec![Element::named(b"#document")];
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => stack.push(Element::named(e.name().as_ref())),
            Event::Empty(e) => {
                let element = Element::named(e.name().as_ref());
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(malformed)?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                let done = stack.pop().ok_or_else(|| malformed("unbalanced end tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => return Err(malformed("unbalanced end tag")),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(document), true) => Ok(document),
        _ => Err(malformed("unclosed element")),
    }
}

fn parse_value(element: &Element) -> Result<Value, RemoteError> {
    let Some(typed) = element.children.first() else {
        // untyped <value> defaults to string
        return Ok(Value::String(element.text.clone()));
    };

    let text = typed.text.as_str();
    match typed.name.as_str() {
        "string" | "base64" | "dateTime.iso8601" => Ok(Value::String(text.to_string())),
        "int" | "i4" | "i8" => text
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| malformed(format!("bad integer '{}'", text))),
        "boolean" => Ok(Value::Bool(text.trim() == "1")),
        "double" => text
            .trim()
            .parse()
            .map(Value::Double)
            .map_err(|_| malformed(format!("bad double '{}'", text))),
        "nil" => Ok(Value::Nil),
        "array" => {
            let data = typed.child("data").ok_or_else(|| malformed("array without data"))?;
            data.children
                .iter()
                .filter(|c| c.name == "value")
                .map(parse_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member
                    .child("name")
                    .ok_or_else(|| malformed("member without name"))?;
                let value = member
                    .child("value")
                    .ok_or_else(|| malformed("member without value"))?;
                members.insert(name.text.clone(), parse_value(value)?);
            }
            Ok(Value::Struct(members))
        }
        other => Err(malformed(format!("unknown value type '{}'", other))),
    }
}

/// Decode a `methodResponse`. A `<fault>` becomes `RemoteError::Fault`.
pub fn decode_response(xml: &str) -> Result<Value, RemoteError> {
    let document = parse_tree(xml)?;
    let response = document
        .child("methodResponse")
        .ok_or_else(|| malformed("missing methodResponse"))?;

    if let Some(fault) = response.child("fault") {
        let value = fault
            .child("value")
            .map(parse_value)
            .transpose()?
            .unwrap_or(Value::Nil);
        return Err(RemoteError::Fault {
            code: value.get("faultCode").and_then(Value::as_i64).unwrap_or(0),
            message: value
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    let value = response
        .child("params")
        .and_then(|p| p.child("param"))
        .and_then(|p| p.child("value"))
        .ok_or_else(|| malformed("missing response value"))?;
    parse_value(value)
}
