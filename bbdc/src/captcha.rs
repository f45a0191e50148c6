//! Captcha images and the strategy used to answer them.
use std::io;

use crate::{Error, Result};

const DEFAULT_MIME: &str = "image/png";

/// A decoded captcha image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaImage {
    mime: String,
    bytes: Vec<u8>,
}

impl CaptchaImage {
    /// Decode a `data:image/png;base64,...` string.
    ///
    /// A bare base64 payload without the `data:` prefix is accepted too and
    /// assumed to be a PNG.
    ///
    /// # Errors
    ///
    /// Fails if the payload is not valid base64 or decodes to nothing.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let (mime, payload) = match uri.split_once(',') {
            Some((header, payload)) => (
                header
                    .strip_prefix("data:")
                    .and_then(|h| h.split(';').next())
                    .filter(|m| !m.is_empty()),
                payload,
            ),
            None => (None, uri),
        };

        let bytes = base64::decode(payload.trim())?;

        if bytes.is_empty() {
            return Err(Error::EmptyCaptcha);
        }

        Ok(Self {
            mime: mime.unwrap_or(DEFAULT_MIME).to_owned(),
            bytes,
        })
    }

    /// MIME type, e.g. `image/png`.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Raw image bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File extension matching the MIME type.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/svg+xml" => "svg",
            "image/bmp" => "bmp",
            _ => "png",
        }
    }
}

/// Turns a captcha image into the text it shows.
///
/// Blocks until an answer is available.
pub trait CaptchaSolver {
    /// Read the captcha.
    ///
    /// # Errors
    ///
    /// Fails if no answer could be obtained.
    fn solve(&self, image: &CaptchaImage) -> io::Result<String>;
}

impl<F> CaptchaSolver for F
where
    F: Fn(&CaptchaImage) -> io::Result<String>,
{
    fn solve(&self, image: &CaptchaImage) -> io::Result<String> {
        self(image)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    // 1x1 transparent gif
    const GIF: &str = "R0lGODlhAQABAAAAACH5BAEKAAEALAAAAAABAAEAAAICTAEAOw==";

    #[test]
    fn strips_data_uri_prefix() {
        let image = CaptchaImage::from_data_uri(&format!("data:image/gif;base64,{GIF}")).unwrap();
        assert_eq!(image.mime(), "image/gif");
        assert_eq!(image.extension(), "gif");
        assert_eq!(&image.bytes()[..6], b"GIF89a");
    }

    #[test]
    fn bare_payload_defaults_to_png() {
        let image = CaptchaImage::from_data_uri(GIF).unwrap();
        assert_eq!(image.mime(), "image/png");
        assert_eq!(image.extension(), "png");
        assert_eq!(&image.bytes()[..6], b"GIF89a");
    }

    #[test]
    fn jpeg_extension() {
        let image = CaptchaImage::from_data_uri("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(image.extension(), "jpg");
    }

    #[test]
    fn invalid_base64() {
        assert_matches!(
            CaptchaImage::from_data_uri("data:image/png;base64,@@@"),
            Err(Error::Captcha(_))
        );
    }

    #[test]
    fn empty_payload() {
        assert_matches!(
            CaptchaImage::from_data_uri("data:image/png;base64,"),
            Err(Error::EmptyCaptcha)
        );
    }

    #[test]
    fn closures_are_solvers() {
        let image = CaptchaImage::from_data_uri(GIF).unwrap();
        let solver =
            |image: &CaptchaImage| Ok::<_, io::Error>(format!("{} bytes", image.bytes().len()));
        assert_eq!(solver.solve(&image).unwrap(), "37 bytes");
    }
}
