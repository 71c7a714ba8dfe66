//! Call construction: statement text and bind lists.

use serde_json::Value;

use orajson_driver::{BindValue, OutBindKind};

use crate::error::Error;
use crate::request::{CallRequest, OutputSpec, RequestContext, Target};

/// Marker substituted for masked string values in log output.
pub const MASKED: &str = "***";

/// A fully built call: what goes over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSpec {
    /// Statement text.
    pub statement: String,
    /// Ordered bind list.
    pub binds: Vec<BindValue>,
}

/// Build the statement text and bind list for a request.
///
/// Procedure calls render as an anonymous block with positional binds:
///
/// ```text
/// Begin pkg_test.getPrice(:1,:2); End;
/// ```
///
/// Raw queries execute the caller's text verbatim with named binds taken
/// from the input object.
pub fn build_call(request: &CallRequest, ctx: &RequestContext) -> Result<CallSpec, Error> {
    let input = request.input.resolve(ctx)?;

    match &request.target {
        Target::Procedure { name } => build_procedure_call(request, name, input),
        Target::RawQuery { text } => build_raw_query(text, input),
    }
}

fn build_procedure_call(
    request: &CallRequest,
    name: &str,
    input: Option<Value>,
) -> Result<CallSpec, Error> {
    let mut binds = Vec::new();

    if let Some(input) = input {
        let serialized = serde_json::to_string(&input)
            .map_err(|e| Error::InvalidRequest(format!("unserializable input: {e}")))?;
        match request.split {
            // Splitting applies only when no output is registered; the
            // chunked signature has a fixed arity of input binds.
            Some(split) if request.output == OutputSpec::None => {
                for chunk in split_chunks(&serialized, split.chunk_size, split.chunk_count)? {
                    binds.push(chunk);
                }
            }
            _ => binds.push(BindValue::Text(serialized)),
        }
    }

    match request.output {
        OutputSpec::None => {}
        OutputSpec::Json => register_outputs(&mut binds, OutBindKind::Clob, request.output_count),
        OutputSpec::Blob => register_outputs(&mut binds, OutBindKind::Blob, request.output_count),
        OutputSpec::Cursor { .. } => {
            register_outputs(&mut binds, OutBindKind::Cursor, request.output_count);
        }
    }

    Ok(CallSpec {
        statement: procedure_block(name, binds.len()),
        binds,
    })
}

fn register_outputs(binds: &mut Vec<BindValue>, kind: OutBindKind, count: usize) {
    for _ in 0..count {
        binds.push(BindValue::Out(kind));
    }
}

fn build_raw_query(text: &str, input: Option<Value>) -> Result<CallSpec, Error> {
    let binds = match input {
        None => Vec::new(),
        Some(Value::Object(object)) => object
            .into_iter()
            .map(|(name, value)| BindValue::Named { name, value })
            .collect(),
        Some(_) => {
            return Err(Error::InvalidRequest(
                "raw-query input must be a JSON object".into(),
            ));
        }
    };
    Ok(CallSpec {
        statement: text.to_string(),
        binds,
    })
}

/// Render the anonymous block for a procedure with `n` positional binds.
fn procedure_block(name: &str, n: usize) -> String {
    let mut placeholders = String::new();
    for i in 1..=n {
        if i > 1 {
            placeholders.push(',');
        }
        placeholders.push(':');
        placeholders.push_str(&i.to_string());
    }
    format!("Begin {name}({placeholders}); End;")
}

/// Split `serialized` into at most `count` chunks of at most `size`
/// characters, padding the tail with NULL binds so the arity stays fixed.
fn split_chunks(serialized: &str, size: usize, count: usize) -> Result<Vec<BindValue>, Error> {
    let mut chunks = Vec::with_capacity(count);
    let mut rest = serialized;
    while !rest.is_empty() {
        if chunks.len() == count {
            return Err(Error::InputTooLarge { size, chunks: count });
        }
        let split_at = rest
            .char_indices()
            .nth(size)
            .map_or(rest.len(), |(byte, _)| byte);
        let (chunk, tail) = rest.split_at(split_at);
        chunks.push(BindValue::Text(chunk.to_string()));
        rest = tail;
    }
    while chunks.len() < count {
        chunks.push(BindValue::Null);
    }
    Ok(chunks)
}

/// Produce the loggable rendering of a request's input payload.
///
/// This is a derived copy: every dotted path in `mask_paths` is walked and
/// the first string value found along it is replaced with [`MASKED`]. The
/// bind list actually sent to the database is never built from this view.
pub fn masked_input(request: &CallRequest, ctx: &RequestContext) -> Option<Value> {
    let mut input = match request.input.resolve(ctx) {
        Ok(input) => input?,
        Err(_) => return None,
    };
    for path in &request.mask_paths {
        mask_path(&mut input, path);
    }
    Some(input)
}

fn mask_path(value: &mut Value, path: &str) {
    let mut cursor = value;
    for segment in path.split('.') {
        match cursor {
            Value::Object(object) => match object.get_mut(segment) {
                Some(next) => {
                    if next.is_string() {
                        *next = Value::String(MASKED.to_string());
                        return;
                    }
                    cursor = next;
                }
                None => return,
            },
            _ => return,
        }
    }
}
