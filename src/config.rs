use fluent_uri::UriRef;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::builder::UrlBuilder;
use crate::error::{ConfigError, Result};
use crate::fetch::{fetch_image, ProxyAddr};

const DEFAULT_ENCODING: &str = "UTF-8";

/// Declarative description of an image request URL.
///
/// Deserializes from JSON such as
///
/// ```json
/// {
///   "endpoint": "http://localhost:8084/img",
///   "image_path": "lenna.png",
///   "image_params": [{ "name": "s", "value": "w320" }],
///   "query_params": [{ "name": "dl", "value": "lenna" }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlConfig {
    pub endpoint: String,
    pub image_path: String,
    pub image_params: Vec<ImageParam>,
    pub query_params: Vec<QueryParam>,
    /// Charset label; `UTF-8` when omitted. An explicit empty label is
    /// rejected by [`UrlConfig::to_builder`].
    pub encoding: String,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            image_path: String::new(),
            image_params: Vec::new(),
            query_params: Vec::new(),
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageParam {
    pub name: String,
    pub value: String,
    /// Join onto an earlier value of the same name instead of replacing it.
    #[serde(default = "default_join")]
    pub join: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub value: String,
}

fn default_join() -> bool {
    true
}

impl ImageParam {
    pub fn new(name: impl Into<String>, value: impl Into<String>, join: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            join,
        }
    }
}

impl QueryParam {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl UrlConfig {
    pub fn new(endpoint: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            image_path: image_path.into(),
            ..Self::default()
        }
    }

    /// Applies this record to a fresh builder.
    ///
    /// Returns `Ok(None)` when either the endpoint or the image path is
    /// empty. Image parameters are applied in order, joined or replaced
    /// according to their `join` flag; query parameters follow.
    pub fn to_builder(&self) -> Result<Option<UrlBuilder>, ConfigError> {
        if self.endpoint.is_empty() || self.image_path.is_empty() {
            return Ok(None);
        }

        let mut builder = UrlBuilder::new(self.endpoint.as_str())?;
        builder
            .set_encoding(Some(self.encoding.as_str()))?
            .set_image_path(Some(self.image_path.as_str()))?;
        for param in &self.image_params {
            builder.put_image_parameter(&param.name, Some(param.value.as_str()), param.join)?;
        }
        for param in &self.query_params {
            builder.set_query_parameter(&param.name, Some(param.value.as_str()))?;
        }
        Ok(Some(builder))
    }

    pub fn produce_url(&self) -> Result<Option<Url>> {
        match self.to_builder()? {
            Some(builder) => Ok(Some(builder.to_url()?)),
            None => Ok(None),
        }
    }

    pub fn produce_uri(&self) -> Result<Option<UriRef<String>>> {
        match self.to_builder()? {
            Some(builder) => Ok(Some(builder.to_uri()?)),
            None => Ok(None),
        }
    }

    pub fn produce_string(&self) -> Result<Option<String>> {
        Ok(self.to_builder()?.map(|builder| builder.render()))
    }

    pub async fn produce_image(&self, proxy: Option<&ProxyAddr>) -> Result<Option<DynamicImage>> {
        match self.to_builder()? {
            Some(builder) => Ok(Some(fetch_image(&builder, proxy).await?)),
            None => Ok(None),
        }
    }
}
