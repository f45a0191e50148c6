//! Logging in: credential probe, captcha and the login itself.
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::{
    captcha::{CaptchaImage, CaptchaSolver},
    client::Tokens,
    course::Course,
    Client, Error, Result,
};

/// Login id and password.
#[derive(Debug)]
pub struct Credentials {
    /// Login id, usually an NRIC or FIN.
    pub user_id: String,

    /// Password.
    pub password: SecretString,
}

impl Credentials {
    /// Bundle a login id with its password.
    #[must_use]
    pub fn new(user_id: impl Into<String>, password: SecretString) -> Self {
        Self {
            user_id: user_id.into(),
            password,
        }
    }
}

/// Answer to a credential check or a login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAck {
    /// Name of the header the token belongs in.
    pub token_header: String,

    /// The login token, `Bearer <jwt>`.
    pub token_content: String,

    /// Display name of the account.
    pub username: String,
}

impl LoginAck {
    /// Token to send as `authorization`.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token_content
    }
}

/// A captcha issued for one login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaChallenge {
    /// `data:` URI of the image.
    pub image: String,

    /// Token identifying the captcha session.
    pub captcha_token: String,

    /// Identifier the answer is verified against.
    pub verify_code_id: String,
}

impl CaptchaChallenge {
    /// Decode the captcha image.
    ///
    /// # Errors
    ///
    /// Fails if the image is not valid base64.
    pub fn image(&self) -> Result<CaptchaImage> {
        CaptchaImage::from_data_uri(&self.image)
    }
}

/// Tokens authorizing slot queries for one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    login_token: String,
    course_token: String,
}

impl Session {
    /// Combine a login with the course it should act on.
    #[must_use]
    pub fn new(login: &LoginAck, course: &Course) -> Self {
        Self {
            login_token: login.token().to_owned(),
            course_token: course.auth_token.clone(),
        }
    }

    /// Token sent as `authorization`.
    #[must_use]
    pub fn login_token(&self) -> &str {
        &self.login_token
    }

    /// Token sent as `jsessionid`.
    #[must_use]
    pub fn course_token(&self) -> &str {
        &self.course_token
    }

    pub(crate) fn tokens(&self) -> Tokens<'_> {
        Tokens {
            authorization: Some(&self.login_token),
            jsessionid: Some(&self.course_token),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckIdAndPass<'a> {
    user_id: &'a str,
    user_pass: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    captcha_token: &'a str,
    verify_code_id: &'a str,
    verify_code_value: &'a str,
    user_id: &'a str,
    user_pass: &'a str,
}

fn bad_credentials(e: Error) -> Error {
    match e {
        Error::Rejected { message, .. } => {
            debug!("bad credentials");
            Error::BadCredentials { message }
        }
        e => e,
    }
}

/// Tell the portal a login is about to happen.
///
/// Does not establish a session.
///
/// # Errors
///
/// [`Error::BadCredentials`] if the portal rejects the id or password.
#[instrument(skip_all, fields(user_id = %credentials.user_id))]
pub async fn check_credentials(client: &Client, credentials: &Credentials) -> Result<LoginAck> {
    let body = CheckIdAndPass {
        user_id: &credentials.user_id,
        user_pass: credentials.password.expose_secret(),
    };

    client
        .post("auth/checkIdAndPass", &body, Tokens::default())
        .await
        .map_err(bad_credentials)
}

/// Get a fresh captcha.
///
/// # Errors
///
/// Fails on transport errors or an unexpected response.
#[instrument(skip(client))]
pub async fn fetch_captcha(client: &Client) -> Result<CaptchaChallenge> {
    client
        .post("auth/getLoginCaptchaImage", &json!({}), Tokens::default())
        .await
}

/// Exchange a solved captcha and the credentials for a login token.
///
/// # Errors
///
/// [`Error::BadCredentials`] if the captcha answer or the credentials are wrong.
#[instrument(skip_all, fields(user_id = %credentials.user_id))]
pub async fn login(
    client: &Client,
    challenge: &CaptchaChallenge,
    answer: &str,
    credentials: &Credentials,
) -> Result<LoginAck> {
    let body = LoginRequest {
        captcha_token: &challenge.captcha_token,
        verify_code_id: &challenge.verify_code_id,
        verify_code_value: answer,
        user_id: &credentials.user_id,
        user_pass: credentials.password.expose_secret(),
    };

    client
        .post("auth/login", &body, Tokens::default())
        .await
        .map_err(bad_credentials)
}

/// Run the whole login: credential probe, captcha, `solver`, login.
///
/// The captcha is fetched once; a wrong answer is not retried.
///
/// # Errors
///
/// Fails if any step fails, or with [`Error::Solver`] if `solver` does.
#[instrument(skip_all, fields(user_id = %credentials.user_id))]
pub async fn login_with(
    client: &Client,
    credentials: &Credentials,
    solver: &impl CaptchaSolver,
) -> Result<LoginAck> {
    check_credentials(client, credentials).await?;

    let challenge = fetch_captcha(client).await?;
    let image = challenge.image()?;

    debug!(mime = image.mime(), len = image.bytes().len(), "got captcha");

    let answer = solver.solve(&image).map_err(Error::Solver)?;

    login(client, &challenge, answer.trim(), credentials).await
}
