use bbdc::{auth::Credentials, slot::LessonFamily, ClientConfig};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};

pub mod report;
pub mod solver;
mod watch;

pub use watch::run;

/// Lists released BBDC practical lesson slots for the given sessions.
#[derive(Debug, clap::Parser)]
#[clap(version)]
pub struct Config {
    /// BBDC login id.
    #[clap(long, env = "BBDC_USERNAME")]
    pub username: String,

    /// BBDC password.
    #[clap(long, env = "BBDC_PASSWORD", hide_env_values = true, parse(from_str = secret))]
    pub password: SecretString,

    /// Course type to look up, e.g. 3C.
    #[clap(long, env = "BBDC_COURSE")]
    pub course: String,

    /// Session numbers to look for, comma separated.
    #[clap(long, env = "BBDC_SESSIONS", value_delimiter = ',', required = true)]
    pub sessions: Vec<u32>,

    /// Lesson family (c3practical, c2practical). Inferred from the course type if
    /// omitted; c2practical has to be given explicitly.
    #[clap(long, env = "BBDC_LESSON_FAMILY")]
    pub family: Option<LessonFamily>,

    /// Root of the booking API.
    #[clap(long, env = "BBDC_BASE_URL", default_value = bbdc::BASE_URL)]
    pub base_url: Url,

    /// Program used to show the captcha image.
    #[clap(long, env = "BBDC_CAPTCHA_VIEWER")]
    pub captcha_viewer: Option<String>,
}

fn secret(s: &str) -> SecretString {
    SecretString::new(s.to_owned())
}

impl Config {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.username.clone(),
            secret(self.password.expose_secret()),
        )
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
    }
}
