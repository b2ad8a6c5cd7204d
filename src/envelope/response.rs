use serde_json::{Map, Value};

/// One flattened XML node: either leaf text or nested children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseNode {
    Text(String),
    Map(ResponseMap),
}

/// Ordered mapping from local element name to node.
///
/// Repeated sibling names are all kept; `get` returns the last one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseMap {
    entries: Vec<(String, ResponseNode)>,
}

impl ResponseNode {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseNode::Text(text) => Some(text),
            ResponseNode::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&ResponseMap> {
        match self {
            ResponseNode::Map(map) => Some(map),
            ResponseNode::Text(_) => None,
        }
    }

    /// Leaf texts of this node in document order.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            ResponseNode::Text(text) => vec![text.as_str()],
            ResponseNode::Map(map) => map.iter().flat_map(|(_, node)| node.texts()).collect(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ResponseNode::Text(text) => Value::String(text.clone()),
            ResponseNode::Map(map) => map.to_json(),
        }
    }
}

impl ResponseMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, node: ResponseNode) {
        self.entries.push((key.into(), node));
    }

    pub fn get(&self, key: &str) -> Option<&ResponseNode> {
        self.entries.iter().rev().find(|(k, _)| k == key).map(|(_, node)| node)
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a ResponseNode> + 'a {
        self.entries.iter().filter(move |(k, _)| k == key).map(|(_, node)| node)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ResponseNode::as_text)
    }

    /// Follows nested maps, e.g. `["detail", "erro"]`.
    pub fn get_path(&self, path: &[&str]) -> Option<&ResponseNode> {
        let (first, rest) = path.split_first()?;
        let node = self.get(first)?;
        if rest.is_empty() {
            Some(node)
        } else {
            node.as_map()?.get_path(rest)
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResponseNode)> {
        self.entries.iter().map(|(k, node)| (k.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON rendering; repeated keys collapse into an array.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (key, node) in &self.entries {
            let value = node.to_json();
            match object.get_mut(key) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    object.insert(key.clone(), value);
                }
            }
        }
        Value::Object(object)
    }
}
