//! The `{success, code, data}` wrapper around every response.
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    code: Option<i64>,
    message: Option<String>,
    data: Option<Value>,
}

/// Decode a response body, yielding its `data` as `T`.
///
/// `data` is only interpreted once `success` is known to be true, so a
/// rejection with an unrelated payload still surfaces as [`Error::Rejected`].
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    let Envelope {
        success,
        code,
        message,
        data,
    } = serde_json::from_str(body)?;

    if !success {
        debug!(?code, ?message, "request rejected");
        return Err(Error::Rejected { code, message });
    }

    let data = data.ok_or(Error::MissingData)?;

    Ok(serde_json::from_value(data)?)
}
