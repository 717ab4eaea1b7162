//! Request URL builder for remote image-processing endpoints.
//!
//! [`UrlBuilder`] assembles `endpoint/name=value/.../image?query` strings with
//! deterministic parameter order, charset-aware percent-encoding and
//! round-robin rotation over shard endpoints. [`config::UrlConfig`] maps a
//! declarative record onto a configured builder, and [`fetch`] retrieves and
//! decodes the processed image.

pub mod builder;
pub mod config;
pub mod encode;
pub mod error;
pub mod fetch;
pub mod util;

pub use builder::UrlBuilder;
pub use config::UrlConfig;
pub use error::{Error, Result};
pub use fetch::{fetch_image, ProxyAddr};
