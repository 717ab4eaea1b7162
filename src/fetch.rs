use std::fmt;
use std::str::FromStr;

use futures_util::StreamExt;
use image::DynamicImage;
use log::debug;
use reqwest::{Client, Proxy};

use crate::builder::UrlBuilder;
use crate::error::{ConfigError, FetchError};

const USER_AGENT: &str = concat!("imgurl/", env!("CARGO_PKG_VERSION"));
const MAX_PREALLOC: u64 = 8 << 20;

/// HTTP proxy given as host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAddr {
    pub host: String,
    pub port: u16,
}

impl ProxyAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn to_proxy(&self) -> reqwest::Result<Proxy> {
        Proxy::all(format!("http://{self}"))
    }
}

impl fmt::Display for ProxyAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ProxyAddr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidProxy(s.to_string());
        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse().map_err(|_| invalid())?;
        Ok(Self::new(host, port))
    }
}

/// Renders `builder` into a URL, downloads it and decodes the image.
///
/// Without a proxy the connection is made directly. Transport and decode
/// failures are returned as they are; nothing is retried or cached and the
/// client's default timeouts apply.
pub async fn fetch_image(
    builder: &UrlBuilder,
    proxy: Option<&ProxyAddr>,
) -> Result<DynamicImage, FetchError> {
    let url = builder.to_url()?;

    let mut client = Client::builder().user_agent(USER_AGENT);
    client = match proxy {
        Some(proxy) => {
            debug!("using proxy {proxy}");
            client.proxy(proxy.to_proxy()?)
        }
        None => client.no_proxy(),
    };
    let client = client.build()?;

    debug!("fetching image from {url}");
    let response = client.get(url.clone()).send().await?;
    if !response.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let capacity = response.content_length().unwrap_or(0).min(MAX_PREALLOC);
    let mut body = Vec::with_capacity(capacity as usize);
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
    }
    debug!("received {} bytes from {url}", body.len());

    Ok(image::load_from_memory(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AddressError;
    use image::ImageFormat;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::new_rgb8(width, height);
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .expect("encode png");
        buf.into_inner()
    }

    fn builder_for(server: &mockito::Server) -> UrlBuilder {
        let mut builder = UrlBuilder::new(format!("{}/img", server.url())).expect("builder");
        builder
            .set_image_path(Some("/lenna.png"))
            .and_then(|b| b.set_image_parameter("s", Some("w4")))
            .and_then(|b| b.set_image_parameter("f", Some("png")))
            .expect("params");
        builder
    }

    #[tokio::test]
    async fn fetches_and_decodes_image() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/img/s=w4/f=png/lenna.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png_bytes(4, 3))
            .create_async()
            .await;

        let image = fetch_image(&builder_for(&server), None)
            .await
            .expect("image");
        assert_eq!((image.width(), image.height()), (4, 3));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/img/s=w4/f=png/lenna.png")
            .with_status(404)
            .create_async()
            .await;

        let err = fetch_image(&builder_for(&server), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/img/s=w4/f=png/lenna.png")
            .with_status(200)
            .with_body("definitely not an image")
            .create_async()
            .await;

        let err = fetch_image(&builder_for(&server), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn relative_endpoint_fails_before_connecting() {
        let mut builder = UrlBuilder::new("/img").expect("builder");
        builder.set_image_path(Some("lenna.png")).expect("path");
        let err = fetch_image(&builder, None).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Address(AddressError::Malformed { .. })
        ));
    }

    #[test]
    fn proxy_address_parses_host_and_port() {
        assert_eq!(
            "proxy.local:3128".parse::<ProxyAddr>().expect("proxy"),
            ProxyAddr::new("proxy.local", 3128)
        );
        assert!("proxy.local".parse::<ProxyAddr>().is_err());
        assert!(":3128".parse::<ProxyAddr>().is_err());
        assert!("proxy.local:http".parse::<ProxyAddr>().is_err());
    }
}
