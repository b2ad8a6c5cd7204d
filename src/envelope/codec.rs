//! SOAP envelope encoding and response flattening.
//!
//! Requests are written as `<xsd:FIELD>value</xsd:FIELD>` children of
//! `xsd:requisicao` inside a fixed envelope. Responses are parsed and the
//! business payload (first element of the first element under the root,
//! i.e. below `Envelope/Body`) is flattened into a [`ResponseMap`] keyed by
//! local element names.

use quick_xml::escape::{escape, unescape};
use roxmltree::{Document, Node};

use crate::envelope::request::RegistrationRequest;
use crate::envelope::response::{ResponseMap, ResponseNode};
use crate::error::{ClientError, Result};

const ENVELOPE_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" "#,
    r#"xmlns:xsd="http://www.tibco.com/schemas/bws_registro_cbr/Recursos/XSD/Schema.xsd">"#,
    "<SOAP-ENV:Body><xsd:requisicao>"
);
const ENVELOPE_CLOSE: &str = "</xsd:requisicao></SOAP-ENV:Body></SOAP-ENV:Envelope>";

/// Wraps the request fields in the registration envelope, preserving order.
pub fn encode(request: &RegistrationRequest) -> Result<String> {
    let mut xml = String::with_capacity(ENVELOPE_OPEN.len() + ENVELOPE_CLOSE.len() + request.len() * 64);
    xml.push_str(ENVELOPE_OPEN);

    for (name, value) in request.iter() {
        if !is_element_name(name) {
            return Err(ClientError::InvalidFieldName(name.to_owned()));
        }
        xml.push_str("<xsd:");
        xml.push_str(name);
        xml.push('>');
        xml.push_str(&escape(value));
        xml.push_str("</xsd:");
        xml.push_str(name);
        xml.push('>');
    }

    xml.push_str(ENVELOPE_CLOSE);
    Ok(xml)
}

/// Parses a response document and flattens its business payload.
pub fn decode(xml: &str) -> Result<ResponseMap> {
    let doc = Document::parse(xml).map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

    let payload = first_element_child(doc.root_element())
        .and_then(first_element_child)
        .ok_or_else(|| {
            ClientError::MalformedResponse("no payload inside the response envelope".to_owned())
        })?;

    match flatten(payload) {
        ResponseNode::Map(map) => Ok(map),
        ResponseNode::Text(_) => Err(ClientError::MalformedResponse(format!(
            "payload '{}' carries no fields",
            payload.tag_name().name()
        ))),
    }
}

fn first_element_child<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.children().find(Node::is_element)
}

fn flatten(node: Node) -> ResponseNode {
    let mut children = node.children().filter(Node::is_element).peekable();
    if children.peek().is_none() {
        return ResponseNode::Text(leaf_text(node));
    }

    let mut map = ResponseMap::new();
    for child in children {
        map.push(child.tag_name().name(), flatten(child));
    }
    ResponseNode::Map(map)
}

/// Longest entity reference decoded, `&#x10FFFF;`.
const MAX_ENTITY_LEN: usize = 10;

/// Trimmed text of a leaf element with leftover entities (e.g. double
/// escaped `&amp;lt;`) decoded once more.
fn leaf_text(node: Node) -> String {
    let raw: String = node.descendants().filter(Node::is_text).filter_map(|n| n.text()).collect();
    decode_entities(raw.trim())
}

/// Decodes every recognizable entity reference; anything else, such as a
/// bare `&`, is kept as is.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let decoded = candidate
            .find(';')
            .filter(|end| *end < MAX_ENTITY_LEN)
            .and_then(|end| unescape(&candidate[..=end]).ok().map(|value| (end, value)));
        match decoded {
            Some((end, value)) => {
                out.push_str(&value);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// XML element name without a prefix: letter or `_` first, then letters,
/// digits, `_`, `-` or `.`.
fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
