mod params;
mod shard;

pub use params::ParamMap;
pub use shard::ShardRing;

use std::fmt;

use fluent_uri::UriRef;
use log::trace;
use url::Url;

use crate::encode::{encode_param_component, encode_path_component, Charset};
use crate::error::{AddressError, ConfigError, ParamKind, UriSyntaxError};

/// Schemes accepted when a rendered string is turned into a [`Url`].
pub const KNOWN_PROTOCOLS: &[&str] = &["http", "https", "ftp", "file"];

/// Image parameter name that would clash with the origin image selector.
const RESERVED_IMAGE_PARAM: &str = "i";

/// Builds request URLs for an image-processing service.
///
/// Image parameters are rendered as path segments (`/name=value`) in front of
/// the image path, query parameters as a regular query string. When more
/// than one endpoint is configured, every render picks the next endpoint in
/// round-robin order.
///
/// ```
/// use imgurl::UrlBuilder;
///
/// let mut builder = UrlBuilder::new("http://localhost:8084/img")?;
/// builder
///     .set_image_path(Some("lenna.png"))?
///     .set_image_parameter("s", Some("w320"))?
///     .join_image_parameter("s", Some("dpr1.5"))?;
/// assert_eq!(
///     builder.render(),
///     "http://localhost:8084/img/s=w320,dpr1.5/lenna.png"
/// );
/// # Ok::<_, imgurl::error::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    shards: ShardRing,
    image_path: Option<String>,
    image_params: ParamMap,
    query_params: ParamMap,
    charset: Charset,
}

impl UrlBuilder {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        Self::with_shards(vec![endpoint.into()])
    }

    /// Creates a builder rotating over several equivalent endpoints.
    pub fn with_shards<I, S>(endpoints: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let shards = ShardRing::new(endpoints.into_iter().map(Into::into).collect())?;
        Ok(Self {
            shards,
            image_path: None,
            image_params: ParamMap::new(),
            query_params: ParamMap::new(),
            charset: Charset::default(),
        })
    }

    /// Creates a builder for a single endpoint assembled from its parts.
    pub fn from_parts(
        protocol: &str,
        host: &str,
        port: Option<u16>,
        path: &str,
    ) -> Result<Self, ConfigError> {
        let protocol = protocol.to_ascii_lowercase();
        if !KNOWN_PROTOCOLS.contains(&protocol.as_str()) {
            return Err(ConfigError::UnsupportedProtocol(protocol));
        }

        let authority = match port {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let sep = if path.is_empty() || path.starts_with('/') {
            ""
        } else {
            "/"
        };
        let raw = format!("{protocol}://{authority}{sep}{path}");
        let endpoint = Url::parse(&raw).map_err(|err| ConfigError::InvalidEndpoint {
            endpoint: raw.clone(),
            reason: err.to_string(),
        })?;

        Self::new(endpoint.as_str())
    }

    /// Sets the charset used for percent-encoding. `None` restores UTF-8.
    pub fn set_encoding(&mut self, label: Option<&str>) -> Result<&mut Self, ConfigError> {
        self.charset = match label {
            Some(label) => Charset::for_label(label)?,
            None => Charset::default(),
        };
        Ok(self)
    }

    /// Sets the origin image, either a path relative to the endpoint or an
    /// absolute URL of an external resource.
    pub fn set_image_path(&mut self, path: Option<&str>) -> Result<&mut Self, ConfigError> {
        if path.is_some_and(str::is_empty) {
            return Err(ConfigError::EmptyImagePath);
        }
        self.image_path = path.map(str::to_string);
        Ok(self)
    }

    /// Stores `value` for `name`, or removes the parameter when `value` is
    /// `None`.
    pub fn set_image_parameter(
        &mut self,
        name: &str,
        value: Option<&str>,
    ) -> Result<&mut Self, ConfigError> {
        self.put_image_parameter(name, value, false)
    }

    /// Appends `value` to the current value of `name` with a `,` separator.
    /// Behaves like [`UrlBuilder::set_image_parameter`] if `name` is unset.
    pub fn join_image_parameter(
        &mut self,
        name: &str,
        value: Option<&str>,
    ) -> Result<&mut Self, ConfigError> {
        self.put_image_parameter(name, value, true)
    }

    pub(crate) fn put_image_parameter(
        &mut self,
        name: &str,
        value: Option<&str>,
        join: bool,
    ) -> Result<&mut Self, ConfigError> {
        validate_name(ParamKind::Image, name)?;
        match value {
            Some("") => return Err(ConfigError::EmptyParameterValue(name.to_string())),
            None if join => return Err(ConfigError::MissingJoinValue(name.to_string())),
            _ => {}
        }
        if name.eq_ignore_ascii_case(RESERVED_IMAGE_PARAM) {
            return Err(ConfigError::ReservedParameterName(name.to_string()));
        }

        match value {
            None => {
                self.image_params.remove(name);
            }
            Some(value) if join => self.image_params.join(name, value),
            Some(value) => self.image_params.insert(name, value.to_string()),
        }
        Ok(self)
    }

    /// Stores a query parameter. An empty value renders the bare name.
    pub fn set_query_parameter(
        &mut self,
        name: &str,
        value: Option<&str>,
    ) -> Result<&mut Self, ConfigError> {
        validate_name(ParamKind::Query, name)?;
        match value {
            Some(value) => self.query_params.insert(name, value.to_string()),
            None => {
                self.query_params.remove(name);
            }
        }
        Ok(self)
    }

    /// Clears the image path and all parameters. Endpoints, encoding and the
    /// rotation position are kept.
    pub fn reset(&mut self) {
        self.image_path = None;
        self.image_params.clear();
        self.query_params.clear();
    }

    pub fn endpoints(&self) -> &[String] {
        self.shards.all()
    }

    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref()
    }

    pub fn image_parameter(&self, name: &str) -> Option<&str> {
        self.image_params.get(name)
    }

    pub fn query_parameter(&self, name: &str) -> Option<&str> {
        self.query_params.get(name)
    }

    /// Canonical name of the configured charset.
    pub fn encoding(&self) -> &'static str {
        self.charset.name()
    }

    /// Renders the request URL.
    ///
    /// Every call advances the shard rotation, so two renders of a
    /// multi-endpoint builder may differ in their endpoint prefix.
    pub fn render(&self) -> String {
        let endpoint = self.shards.next();
        let mut url = String::from(endpoint.strip_suffix('/').unwrap_or(endpoint));

        for (name, value) in self.image_params.iter() {
            url.push('/');
            url.push_str(&name.to_ascii_lowercase());
            url.push('=');
            url.push_str(&encode_param_component(&value.to_lowercase(), self.charset));
        }

        let path = match self.image_path.as_deref() {
            Some(path) => {
                if !path.starts_with('/') {
                    url.push('/');
                }
                path
            }
            None => "/",
        };
        let path = path.strip_suffix('#').unwrap_or(path);
        let path = path.strip_suffix('?').unwrap_or(path);
        if path.contains("://") {
            url.push_str(&encode_path_component(path, self.charset));
        } else {
            url.push_str(path);
        }

        let mut sep = '?';
        for (name, value) in self.query_params.iter() {
            url.push(sep);
            url.push_str(name);
            if !value.is_empty() {
                url.push('=');
                url.push_str(&encode_param_component(value, self.charset));
            }
            sep = '&';
        }

        trace!("rendered {url} via {endpoint}");
        url
    }

    /// Renders and parses the result as an absolute URL.
    pub fn to_url(&self) -> Result<Url, AddressError> {
        parse_url(self.render())
    }

    /// Renders and parses the result as a URI reference. Unlike
    /// [`UrlBuilder::to_url`] this accepts relative endpoints such as `/img`.
    pub fn to_uri(&self) -> Result<UriRef<String>, UriSyntaxError> {
        let rendered = self.render();
        rendered.parse::<UriRef<String>>().map_err(|err| UriSyntaxError {
            reason: err.to_string(),
            input: rendered,
        })
    }

    /// Same as [`UrlBuilder::to_url`] for configurations known to be valid.
    ///
    /// # Panics
    /// Panics if the rendered string is not an absolute URL with a known
    /// protocol, e.g. when the endpoint is a relative path.
    pub fn build(&self) -> Url {
        match self.to_url() {
            Ok(url) => url,
            Err(err) => panic!("{err}"),
        }
    }
}

/// Writes [`UrlBuilder::render`]; note that formatting advances the shard
/// rotation as well.
impl fmt::Display for UrlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn validate_name(kind: ParamKind, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyParameterName { kind });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::InvalidParameterName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn parse_url(input: String) -> Result<Url, AddressError> {
    let url = match Url::parse(&input) {
        Ok(url) => url,
        Err(source) => return Err(AddressError::Malformed { input, source }),
    };
    if !KNOWN_PROTOCOLS.contains(&url.scheme()) {
        return Err(AddressError::UnknownProtocol {
            scheme: url.scheme().to_string(),
            input,
        });
    }
    Ok(url)
}
