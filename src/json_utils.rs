use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// Type of a JSON node found by the structure scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Coordinates of a JSON structure within a larger text, including nested children.
#[derive(Debug, Clone)]
pub struct ObjCoords {
    pub start: usize,
    pub end: usize, // inclusive index of the closing bracket/brace
    pub kind: NodeType,
    pub children: Vec<ObjCoords>,
}

impl ObjCoords {
    pub fn new(start: usize, end: usize, kind: NodeType, children: Vec<ObjCoords>) -> Self {
        Self { start, end, kind, children }
    }

    /// The slice of `text` this node covers.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..=self.end]
    }
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<ObjCoords>,
}

/// Find all JSON object/array structures in the given text. Coordinates are byte indices.
///
/// Brackets inside string literals are ignored; a closer that does not match the
/// innermost opener discards that opener.
#[instrument(target = "semantic_quiz::json", skip(text))]
pub fn find_json_structures(text: &str) -> Vec<ObjCoords> {
    let bytes = text.as_bytes();
    let mut results: Vec<ObjCoords> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let closing = match b {
            b'"' => {
                in_string = true;
                continue;
            }
            b'{' => {
                stack.push(Frame { start: i, kind: NodeType::Object, children: Vec::new() });
                continue;
            }
            b'[' => {
                stack.push(Frame { start: i, kind: NodeType::Array, children: Vec::new() });
                continue;
            }
            b'}' => NodeType::Object,
            b']' => NodeType::Array,
            _ => continue,
        };

        if let Some(frame) = stack.pop() {
            if frame.kind == closing {
                let node = ObjCoords::new(frame.start, i, closing, frame.children);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => results.push(node),
                }
            }
        }
    }

    debug!(target: "semantic_quiz::json", count = results.len(), "found root structures");
    results
}

/// Deserialize the first `T` found in a model reply.
///
/// The whole reply is tried first, then every root structure in order. Nested
/// children are never consulted: a list containing one malformed element is
/// rejected as a whole. On failure the error of the first root structure is
/// returned (or the whole-text error when the reply has no structures).
#[instrument(target = "semantic_quiz::json", skip(text), fields(text_len = text.len()))]
pub fn extract_first<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let whole_err = match serde_json::from_str::<T>(text.trim()) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let mut first_err = None;
    for node in find_json_structures(text) {
        match serde_json::from_str::<T>(node.slice(text)) {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!(target: "semantic_quiz::json", start = node.start, end = node.end, error = %e, "structure rejected");
                first_err.get_or_insert(e);
            }
        }
    }

    Err(first_err.unwrap_or(whole_err))
}
