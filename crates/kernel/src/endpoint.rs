use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Logical label grouping cached queries for bulk invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(&'static str);

impl Tag {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// HTTP verbs used by the lending API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Read operation whose result is cached and may provide tags.
    Query,
    /// Write operation that is never cached and may invalidate tags.
    Mutation,
}

/// Static description of a named API operation.
#[derive(Debug, Clone, Copy)]
pub struct EndpointDescriptor {
    pub name: &'static str,
    pub kind: EndpointKind,
    pub method: Method,
    /// Path relative to the base URL, with `{param}` placeholders.
    pub path: &'static str,
    /// Name of the request-body shape, if the operation sends one.
    pub body: Option<&'static str>,
    pub provides: &'static [Tag],
    pub invalidates: &'static [Tag],
}

impl EndpointDescriptor {
    /// Substitute placeholders and split the path into URL segments.
    pub fn render_path(&self, params: &[(&'static str, String)]) -> Result<Vec<String>, EndpointError> {
        self.path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let Some(name) = segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                else {
                    return Ok(segment.to_string());
                };

                params
                    .iter()
                    .find(|(param, value)| *param == name && !value.is_empty())
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| EndpointError::MissingParam {
                        endpoint: self.name,
                        param: name.to_string(),
                    })
            })
            .collect()
    }
}

/// Fully resolved request, ready to be handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub segments: Vec<String>,
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("missing path parameter '{param}' for {endpoint}")]
    MissingParam {
        endpoint: &'static str,
        param: String,
    },

    #[error("failed to encode request for {endpoint}: {source}")]
    Encode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A named operation against the lending API.
///
/// Implementors are zero-sized markers; the argument and output types carry
/// the payload shapes, and [`Endpoint::DESCRIPTOR`] carries verb, path and
/// tag relationships.
pub trait Endpoint: Send + Sync + 'static {
    type Arg: Serialize + Send + Sync + 'static;
    type Output: DeserializeOwned + Send + 'static;

    const DESCRIPTOR: EndpointDescriptor;

    /// Values for the `{param}` placeholders of the path template.
    fn path_params(_arg: &Self::Arg) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// JSON request body, if any.
    fn body(_arg: &Self::Arg) -> Result<Option<Value>, serde_json::Error> {
        Ok(None)
    }

    fn request(arg: &Self::Arg) -> Result<RequestSpec, EndpointError> {
        let descriptor = Self::DESCRIPTOR;
        let segments = descriptor.render_path(&Self::path_params(arg))?;
        let body = Self::body(arg).map_err(|source| EndpointError::Encode {
            endpoint: descriptor.name,
            source,
        })?;

        Ok(RequestSpec {
            method: descriptor.method,
            segments,
            body,
        })
    }
}
