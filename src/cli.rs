use std::convert::TryFrom;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};

use imgurl::util::parse_pair;
use imgurl::{ProxyAddr, UrlBuilder, UrlConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "imgurl", author, version, about = "Build request URLs for an image-processing service", long_about = None)]
pub struct Cli {
    /// Service endpoint(s). Additional endpoints are used round-robin.
    #[arg(value_name = "endpoint", required_unless_present = "config")]
    pub endpoints: Vec<String>,

    /// Origin image path or absolute image URL
    #[arg(short = 'i', long = "path", value_name = "path")]
    pub path: Option<String>,

    /// Set an image parameter; a bare name removes it
    #[arg(short = 'p', long = "param", value_name = "name=value")]
    pub params: Vec<String>,

    /// Join a value onto an image parameter
    #[arg(short = 'j', long = "join", value_name = "name=value")]
    pub joins: Vec<String>,

    /// Add a query parameter; a bare name renders without a value
    #[arg(long = "query", value_name = "name[=value]")]
    pub queries: Vec<String>,

    /// Charset used for percent-encoding
    #[arg(short = 'e', long = "encoding", value_name = "charset")]
    pub encoding: Option<String>,

    /// Load the request from a JSON file
    #[arg(short = 'f', long = "config", value_name = "file", conflicts_with = "endpoints")]
    pub config: Option<PathBuf>,

    /// Validate and print the result as a URI reference
    #[arg(long = "uri", action = ArgAction::SetTrue, conflicts_with = "fetch")]
    pub uri: bool,

    /// Number of URLs to render (shows shard rotation)
    #[arg(short = 'n', long = "count", value_name = "int", default_value_t = 1)]
    pub count: usize,

    /// Fetch the image and save it to this path
    #[arg(long = "fetch", value_name = "path")]
    pub fetch: Option<PathBuf>,

    /// HTTP proxy used by --fetch
    #[arg(long = "proxy", value_name = "host:port", requires = "fetch")]
    pub proxy: Option<String>,

    /// Quiet mode
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Render,
    Uri,
    Fetch(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub builder: UrlBuilder,
    pub count: usize,
    pub output: Output,
    pub proxy: Option<ProxyAddr>,
}

impl TryFrom<Cli> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let mut builder = match &cli.config {
            Some(path) => load_config(path)?,
            None => UrlBuilder::with_shards(cli.endpoints.iter().cloned())
                .context("invalid endpoint")?,
        };

        if let Some(encoding) = cli.encoding.as_deref() {
            builder.set_encoding(Some(encoding))?;
        }
        if let Some(path) = cli.path.as_deref() {
            builder.set_image_path(Some(path))?;
        }
        for arg in &cli.params {
            let (name, value) = parse_pair(arg)?;
            let value = Some(value.as_str()).filter(|v| !v.is_empty());
            builder
                .set_image_parameter(&name, value)
                .with_context(|| format!("invalid --param {arg:?}"))?;
        }
        for arg in &cli.joins {
            let (name, value) = parse_pair(arg)?;
            builder
                .join_image_parameter(&name, Some(value.as_str()))
                .with_context(|| format!("invalid --join {arg:?}"))?;
        }
        for arg in &cli.queries {
            let (name, value) = parse_pair(arg)?;
            builder
                .set_query_parameter(&name, Some(value.as_str()))
                .with_context(|| format!("invalid --query {arg:?}"))?;
        }

        let proxy = match cli.proxy.as_deref() {
            Some(proxy) => Some(proxy.parse::<ProxyAddr>()?),
            None => None,
        };

        let output = if let Some(path) = cli.fetch.clone() {
            Output::Fetch(path)
        } else if cli.uri {
            Output::Uri
        } else {
            Output::Render
        };

        Ok(RunConfig {
            builder,
            count: cli.count.max(1),
            output,
            proxy,
        })
    }
}

fn load_config(path: &Path) -> Result<UrlBuilder> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let config: UrlConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {:?}", path))?;
    config
        .to_builder()?
        .ok_or_else(|| anyhow!("config file {:?} needs an endpoint and an image path", path))
}
