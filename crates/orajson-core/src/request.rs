//! Request descriptors and the per-call input context.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

/// Default cursor fetch batch size.
pub const DEFAULT_FETCH_ROWS: usize = 10;

/// What the call is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A stored procedure, invoked through an anonymous block.
    Procedure {
        /// Possibly package-qualified procedure name.
        name: String,
    },
    /// A caller-supplied SQL text executed verbatim with named binds.
    RawQuery {
        /// The statement text.
        text: String,
    },
}

/// Where the call's input payload comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputSource {
    /// The call takes no input.
    #[default]
    None,
    /// An explicit value supplied with the descriptor.
    Inline(Value),
    /// A named section of the surrounding request (`query`, `body`, ...).
    Section(String),
}

/// The result shape the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSpec {
    /// No output binds; success is the call returning.
    #[default]
    None,
    /// A CLOB out bind parsed as JSON.
    Json,
    /// A BLOB out bind returned as raw bytes.
    Blob,
    /// One or more cursors fetched in row batches.
    Cursor {
        /// Rows per fetch.
        batch_size: usize,
    },
}

/// Fixed-arity splitting of an oversized serialized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSplit {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Number of chunk binds the procedure signature expects.
    pub chunk_count: usize,
}

/// An immutable description of one database call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    /// Procedure or raw statement.
    pub target: Target,
    /// Input payload selector.
    pub input: InputSource,
    /// Expected output shape.
    pub output: OutputSpec,
    /// Number of output binds to register (LOB outputs only).
    pub output_count: usize,
    /// Optional input splitting parameters.
    pub split: Option<InputSplit>,
    /// Dotted paths whose string leaves are redacted in log output.
    pub mask_paths: Vec<String>,
    /// Route failures through the error channel instead of a direct
    /// response; a hint for the embedding framework.
    pub defer_response: bool,
    /// Invoke the injected cache hook after a successful call.
    pub cache: bool,
}

impl CallRequest {
    /// Describe a stored-procedure call with no input and no output.
    pub fn procedure(name: impl Into<String>) -> Self {
        Self {
            target: Target::Procedure { name: name.into() },
            input: InputSource::None,
            output: OutputSpec::None,
            output_count: 1,
            split: None,
            mask_paths: Vec::new(),
            defer_response: false,
            cache: false,
        }
    }

    /// Describe a raw-SQL query fetched through a cursor.
    pub fn raw_query(text: impl Into<String>) -> Self {
        Self {
            target: Target::RawQuery { text: text.into() },
            output: OutputSpec::Cursor {
                batch_size: DEFAULT_FETCH_ROWS,
            },
            ..Self::procedure(String::new())
        }
    }

    /// Take the input payload from an inline value.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.input = InputSource::Inline(inputs);
        self
    }

    /// Take the input payload from a named request section.
    #[must_use]
    pub fn from_section(mut self, section: impl Into<String>) -> Self {
        self.input = InputSource::Section(section.into());
        self
    }

    /// Set the expected output shape.
    #[must_use]
    pub fn with_output(mut self, output: OutputSpec) -> Self {
        self.output = output;
        self
    }

    /// Register `count` output binds instead of one.
    #[must_use]
    pub fn with_output_count(mut self, count: usize) -> Self {
        self.output_count = count.max(1);
        self
    }

    /// Split the serialized input into a fixed number of chunk binds.
    #[must_use]
    pub fn with_split(mut self, chunk_size: usize, chunk_count: usize) -> Self {
        self.split = Some(InputSplit {
            chunk_size,
            chunk_count,
        });
        self
    }

    /// Redact the string leaves at these dotted paths in log output.
    #[must_use]
    pub fn with_mask_paths(mut self, paths: Vec<String>) -> Self {
        self.mask_paths = paths;
        self
    }

    /// Route failures through the error channel.
    #[must_use]
    pub fn defer_response(mut self) -> Self {
        self.defer_response = true;
        self
    }

    /// Invoke the cache hook after success.
    #[must_use]
    pub fn with_cache(mut self) -> Self {
        self.cache = true;
        self
    }

    /// The name executions are recorded under: the last `.`-separated
    /// segment of the procedure identity, or `query` for raw SQL.
    #[must_use]
    pub fn bare_name(&self) -> &str {
        match &self.target {
            Target::Procedure { name } => name.rsplit('.').next().unwrap_or(name),
            Target::RawQuery { .. } => "query",
        }
    }
}

/// The wire shape of a request descriptor, as embedding frameworks supply it.
///
/// Field presence decides behavior in the legacy shape; [`CallRequest::from_spec`]
/// folds it into the tagged variants above and rejects inconsistent
/// combinations instead of silently preferring one field.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RequestSpec {
    /// Possibly package-qualified procedure name.
    pub procedure: Option<String>,
    /// Raw SQL text (mutually exclusive with `procedure`).
    pub query: Option<String>,
    /// Explicit input payload.
    pub inputs: Option<Value>,
    /// Name of the request section to read the input from.
    pub request: Option<String>,
    /// Whether an output bind is registered.
    #[serde(default)]
    pub output: bool,
    /// CLOB (default), BLOB or CURSOR.
    pub output_type: Option<String>,
    /// Number of output binds.
    pub output_count: Option<usize>,
    /// Cursor fetch batch size.
    pub num_rows: Option<usize>,
    /// Maximum characters per input chunk.
    pub input_split_size: Option<usize>,
    /// Number of input chunk binds.
    pub input_split_number: Option<usize>,
    /// Dotted paths redacted in log output.
    #[serde(default)]
    pub debug_mask_list: Vec<String>,
    /// Route failures through the error channel.
    #[serde(default)]
    pub no_respond: bool,
    /// Invoke the cache hook after success.
    #[serde(default)]
    pub cache: bool,
}

impl CallRequest {
    /// Convert the legacy field-presence shape into a tagged descriptor.
    pub fn from_spec(spec: RequestSpec) -> Result<Self, Error> {
        let target = match (spec.procedure, spec.query) {
            (Some(name), None) => Target::Procedure { name },
            (None, Some(text)) => Target::RawQuery { text },
            (Some(_), Some(_)) => {
                return Err(Error::InvalidRequest(
                    "both `procedure` and `query` given".into(),
                ));
            }
            (None, None) => {
                return Err(Error::InvalidRequest(
                    "one of `procedure` or `query` is required".into(),
                ));
            }
        };

        let input = match (spec.inputs, spec.request) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidRequest(
                    "both `inputs` and `request` given".into(),
                ));
            }
            (Some(value), None) => InputSource::Inline(value),
            (None, Some(section)) => InputSource::Section(section),
            (None, None) => InputSource::None,
        };

        let batch_size = spec.num_rows.unwrap_or(DEFAULT_FETCH_ROWS).max(1);
        let output = if matches!(target, Target::RawQuery { .. }) {
            if spec.output_type.is_some() {
                return Err(Error::InvalidRequest(
                    "`outputType` does not apply to raw queries".into(),
                ));
            }
            if spec.output {
                OutputSpec::Cursor { batch_size }
            } else {
                OutputSpec::None
            }
        } else if spec.output {
            match spec.output_type.as_deref() {
                None | Some("CLOB") => OutputSpec::Json,
                Some("BLOB") => OutputSpec::Blob,
                Some("CURSOR") => OutputSpec::Cursor { batch_size },
                Some(other) => {
                    return Err(Error::InvalidRequest(format!(
                        "unknown outputType `{other}`"
                    )));
                }
            }
        } else {
            OutputSpec::None
        };

        let split = match (spec.input_split_size, spec.input_split_number) {
            (Some(chunk_size), Some(chunk_count)) if chunk_size > 0 && chunk_count > 0 => {
                Some(InputSplit {
                    chunk_size,
                    chunk_count,
                })
            }
            (None, None) => None,
            _ => {
                return Err(Error::InvalidRequest(
                    "`inputSplitSize` and `inputSplitNumber` must be given together and non-zero"
                        .into(),
                ));
            }
        };

        Ok(Self {
            target,
            input,
            output,
            output_count: spec.output_count.unwrap_or(1).max(1),
            split,
            mask_paths: spec.debug_mask_list,
            defer_response: spec.no_respond,
            cache: spec.cache,
        })
    }
}

/// Named sections of the surrounding request that a descriptor can bind
/// input from (`query`, `body`, `allParams`, ...).
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    sections: HashMap<String, Value>,
}

impl RequestContext {
    /// An empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named section.
    #[must_use]
    pub fn with_section(mut self, name: impl Into<String>, value: Value) -> Self {
        self.sections.insert(name.into(), value);
        self
    }

    /// Look up a section by name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }
}

impl InputSource {
    /// Resolve the input payload against the request context.
    pub fn resolve(&self, ctx: &RequestContext) -> Result<Option<Value>, Error> {
        match self {
            InputSource::None => Ok(None),
            InputSource::Inline(value) => Ok(Some(value.clone())),
            InputSource::Section(name) => ctx
                .section(name)
                .cloned()
                .map(Some)
                .ok_or_else(|| Error::MissingSection(name.clone())),
        }
    }
}
