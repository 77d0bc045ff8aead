//! Unified error type.

/// The error type returned by sprig's fallible operations.
///
/// Routing misses (404, 405) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// configuration faults found while parsing route templates and
/// infrastructure failures such as binding to a port.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid template `{template}`: {reason}")]
    Template { template: String, reason: &'static str },

    #[error("invalid pattern in `{template}`: {source}")]
    Pattern {
        template: String,
        #[source]
        source: regex::Error,
    },
}

impl Error {
    pub(crate) fn template(template: &str, reason: &'static str) -> Self {
        Self::Template { template: template.to_owned(), reason }
    }
}
