use reqwest::StatusCode;
use thiserror::Error;

/// Invalid configuration passed to a constructor or mutator.
///
/// The builder is left untouched whenever one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one service endpoint is required")]
    NoEndpoints,
    #[error("service endpoint at index {0} must not be empty")]
    EmptyEndpoint(usize),
    #[error("unsupported protocol \"{0}\"")]
    UnsupportedProtocol(String),
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("{kind} parameter name must not be empty")]
    EmptyParameterName { kind: ParamKind },
    #[error("{kind} parameter \"{name}\" is not a valid parameter name")]
    InvalidParameterName { kind: ParamKind, name: String },
    #[error("image parameter \"{0}\" is reserved; set the image path instead")]
    ReservedParameterName(String),
    #[error("value for image parameter \"{0}\" must not be empty")]
    EmptyParameterValue(String),
    #[error("value to join onto image parameter \"{0}\" is required")]
    MissingJoinValue(String),
    #[error("image path must not be empty")]
    EmptyImagePath,
    #[error("encoding name must not be empty")]
    EmptyEncoding,
    #[error("unsupported encoding \"{0}\"")]
    UnsupportedEncoding(String),
    #[error("invalid proxy address {0:?}; expected host:port")]
    InvalidProxy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Image,
    Query,
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKind::Image => f.write_str("image"),
            ParamKind::Query => f.write_str("query"),
        }
    }
}

/// A rendered string that cannot be turned into an absolute URL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("malformed URL {input:?}: {source}")]
    Malformed {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unknown protocol \"{scheme}\" in {input:?}")]
    UnknownProtocol { input: String, scheme: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid URI syntax in {input:?}: {reason}")]
pub struct UriSyntaxError {
    pub input: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("I/O error while fetching image: {0}")]
    Io(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Uri(#[from] UriSyntaxError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
