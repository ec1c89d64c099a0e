use std::fmt;

use serde::Serialize;

/// Identity of a cached query: endpoint name plus its serialized argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    endpoint: &'static str,
    arg: String,
}

impl QueryKey {
    pub fn new<A: Serialize + ?Sized>(endpoint: &'static str, arg: &A) -> serde_json::Result<Self> {
        Ok(Self {
            endpoint,
            arg: serde_json::to_string(arg)?,
        })
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn arg(&self) -> &str {
        &self.arg
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.arg)
    }
}
