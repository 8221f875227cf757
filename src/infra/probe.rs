//! HTTP reachability strategies.
//!
//! An image counts as reachable when the response is 2xx and its first bytes
//! decode as a known image format. The cross-origin variant additionally
//! demands an `Access-Control-Allow-Origin` header that admits our origin,
//! which is what a browser would need before painting the image.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, header};

use crate::application::probe::{ExistenceStrategy, ReachabilityStrategy, RetryStrategy};
use crate::application::store::ObjectStore;
use crate::config::ProbeSettings;
use crate::domain::StrategyKind;
use crate::domain::error::ProbeFailure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    /// Send `Origin` and require a matching allow-origin header.
    Cors { origin: Option<String> },
    /// No cross-origin requirements.
    Plain,
}

pub struct ImageFetchStrategy {
    client: Client,
    mode: FetchMode,
    sniff_bytes: usize,
}

impl ImageFetchStrategy {
    pub fn new(client: Client, mode: FetchMode, sniff_bytes: usize) -> Self {
        Self {
            client,
            mode,
            sniff_bytes: sniff_bytes.max(16),
        }
    }

    pub fn mode(&self) -> &FetchMode {
        &self.mode
    }

    fn check_cors(&self, response: &Response) -> Result<(), ProbeFailure> {
        let FetchMode::Cors { origin } = &self.mode else {
            return Ok(());
        };

        let allowed = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok())
            .map(str::trim);

        match (allowed, origin.as_deref()) {
            (None, _) => Err(ProbeFailure::Cors("missing allow-origin header".to_string())),
            (Some("*"), _) | (Some(_), None) => Ok(()),
            (Some(allowed), Some(origin)) if allowed == origin => Ok(()),
            (Some(allowed), Some(_)) => Err(ProbeFailure::Cors(format!(
                "origin not allowed (allow-origin `{allowed}`)"
            ))),
        }
    }

    async fn sniff(&self, mut response: Response) -> Result<Vec<u8>, ProbeFailure> {
        let mut head = Vec::with_capacity(self.sniff_bytes);
        while head.len() < self.sniff_bytes {
            match response.chunk().await.map_err(request_failure)? {
                Some(chunk) => head.extend_from_slice(&chunk),
                None => break,
            }
        }
        head.truncate(self.sniff_bytes);
        Ok(head)
    }
}

#[async_trait]
impl ReachabilityStrategy for ImageFetchStrategy {
    fn kind(&self) -> StrategyKind {
        match self.mode {
            FetchMode::Cors { .. } => StrategyKind::ImageCors,
            FetchMode::Plain => StrategyKind::ImagePlain,
        }
    }

    async fn check(&self, url: &str, timeout: Duration) -> Result<(), ProbeFailure> {
        let mut request = self.client.get(url).timeout(timeout);
        if let FetchMode::Cors {
            origin: Some(origin),
        } = &self.mode
        {
            request = request.header(header::ORIGIN, origin.as_str());
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                ProbeFailure::Timeout(timeout)
            } else {
                request_failure(err)
            }
        })?;

        if let Some(failure) = ProbeFailure::from_status(response.status().as_u16()) {
            return Err(failure);
        }
        self.check_cors(&response)?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase);
        if let Some(content_type) = content_type.as_deref()
            && !content_type.starts_with("image/")
            && !content_type.starts_with("application/octet-stream")
        {
            return Err(ProbeFailure::NotAnImage(format!(
                "content type `{content_type}`"
            )));
        }

        let head = self.sniff(response).await?;
        if looks_like_image(&head) {
            Ok(())
        } else {
            Err(ProbeFailure::NotAnImage(
                "unrecognized image signature".to_string(),
            ))
        }
    }
}

fn request_failure(err: reqwest::Error) -> ProbeFailure {
    ProbeFailure::Network(err.to_string())
}

/// Raster formats by magic number; SVG by its opening markup.
pub fn looks_like_image(head: &[u8]) -> bool {
    if imagesize::image_type(head).is_ok() {
        return true;
    }
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

/// Strategies in the configured order.
pub fn build_strategies(
    settings: &ProbeSettings,
    site_origin: Option<String>,
    client: Client,
    store: Arc<dyn ObjectStore>,
) -> Vec<Arc<dyn ReachabilityStrategy>> {
    let sniff_bytes = settings.sniff_bytes.get();
    let cors = || {
        ImageFetchStrategy::new(
            client.clone(),
            FetchMode::Cors {
                origin: site_origin.clone(),
            },
            sniff_bytes,
        )
    };

    settings
        .strategies
        .iter()
        .filter_map(|kind| -> Option<Arc<dyn ReachabilityStrategy>> {
            match kind {
                StrategyKind::ImageCors => Some(Arc::new(cors())),
                StrategyKind::ImagePlain => Some(Arc::new(ImageFetchStrategy::new(
                    client.clone(),
                    FetchMode::Plain,
                    sniff_bytes,
                ))),
                StrategyKind::Existence => Some(Arc::new(ExistenceStrategy::new(store.clone()))),
                StrategyKind::ImageRetry => Some(Arc::new(RetryStrategy::new(
                    Arc::new(cors()),
                    settings.retry_attempts.get(),
                    settings.retry_step,
                ))),
                StrategyKind::Inline => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_raster_signatures() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
        assert!(looks_like_image(&png));
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00";
        assert!(looks_like_image(gif));
    }

    #[test]
    fn recognizes_svg_markup() {
        assert!(looks_like_image(b"  <svg xmlns=\"http://www.w3.org/2000/svg\">"));
        assert!(looks_like_image(
            b"<?xml version=\"1.0\"?>\n<svg viewBox=\"0 0 1 1\">"
        ));
    }

    #[test]
    fn rejects_html_error_pages() {
        assert!(!looks_like_image(b"<!doctype html><html><body>denied"));
        assert!(!looks_like_image(b""));
    }

    #[test]
    fn builds_strategies_in_configured_order() {
        let settings = ProbeSettings {
            strategies: vec![StrategyKind::Existence, StrategyKind::ImageRetry],
            timeout: Duration::from_secs(1),
            retry_attempts: std::num::NonZeroU32::new(2).expect("non-zero"),
            retry_step: Duration::from_millis(10),
            sniff_bytes: std::num::NonZeroUsize::new(64).expect("non-zero"),
        };

        struct Never;

        #[async_trait]
        impl ObjectStore for Never {
            fn public_url(&self, path: &str) -> String {
                path.to_string()
            }

            async fn head_or_probe(&self, _url: &str) -> bool {
                false
            }
        }

        let strategies = build_strategies(&settings, None, Client::new(), Arc::new(Never));
        let kinds: Vec<_> = strategies.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![StrategyKind::Existence, StrategyKind::ImageRetry]);
    }
}
