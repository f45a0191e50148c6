#![doc = include_str!("../README.md")]
#![warn(
    unreachable_pub,
    missing_debug_implementations,
    missing_docs,
    clippy::pedantic
)]

pub mod auth;
pub mod captcha;
mod client;
pub mod course;
mod envelope;
pub mod slot;

pub use client::*;

/// An error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The portal refused the login id, password or captcha answer.
    #[error("bad credentials: {}", .message.as_deref().unwrap_or("login rejected"))]
    BadCredentials {
        /// Message returned by the portal, if any.
        message: Option<String>,
    },

    /// Some HTTP request failed, or the server answered with a non-2xx status.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Schema(#[from] serde_json::Error),

    /// A successful response carried no `data`.
    #[error("response carried no data")]
    MissingData,

    /// The portal answered with `success: false`.
    #[error("request rejected: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        /// Portal status code, if any.
        code: Option<i64>,
        /// Message returned by the portal, if any.
        message: Option<String>,
    },

    /// None of the account's active courses has the requested course type.
    #[error("no active course of type {0:?}")]
    CourseNotFound(String),

    /// The captcha image is not valid base64.
    #[error("invalid captcha image: {0}")]
    Captcha(#[from] base64::DecodeError),

    /// The captcha image decoded to nothing.
    #[error("captcha image is empty")]
    EmptyCaptcha,

    /// A token could not be sent as a header value.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// The captcha solver could not produce an answer.
    #[error("captcha solver failed: {0}")]
    Solver(#[source] std::io::Error),
}

/// BBDC result.
pub type Result<T, E = Error> = core::result::Result<T, E>;
