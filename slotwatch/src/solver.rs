//! Asking a human to read the captcha.
use std::{
    io::{self, BufRead, Write},
    path::Path,
    process::Command,
};

use bbdc::captcha::{CaptchaImage, CaptchaSolver};
use tracing::{debug, warn};

#[cfg(target_os = "macos")]
const DEFAULT_VIEWER: &str = "open";
#[cfg(not(target_os = "macos"))]
const DEFAULT_VIEWER: &str = "xdg-open";

/// Shows the captcha with an image viewer and reads the answer from stdin.
#[derive(Debug, Default)]
pub struct TerminalSolver {
    viewer: Option<String>,
}

impl TerminalSolver {
    /// Use `viewer` instead of the platform default (`open` / `xdg-open`).
    pub fn new(viewer: Option<String>) -> Self {
        Self { viewer }
    }

    fn viewer(&self) -> &str {
        self.viewer.as_deref().unwrap_or(DEFAULT_VIEWER)
    }

    fn show(&self, path: &Path) {
        match Command::new(self.viewer()).arg(path).status() {
            Ok(status) if status.success() => debug!(viewer = self.viewer(), "captcha shown"),
            Ok(status) => warn!(viewer = self.viewer(), %status, "captcha viewer failed"),
            Err(e) => warn!(viewer = self.viewer(), error = %e, "cannot start captcha viewer"),
        }
    }
}

impl CaptchaSolver for TerminalSolver {
    fn solve(&self, image: &CaptchaImage) -> io::Result<String> {
        let mut file = tempfile::Builder::new()
            .prefix("bbdc-captcha-")
            .suffix(&format!(".{}", image.extension()))
            .tempfile()?;
        file.write_all(image.bytes())?;
        file.flush()?;

        self.show(file.path());

        prompt(&mut io::stdin().lock(), &mut io::stderr(), file.path())
    }
}

fn prompt(input: &mut impl BufRead, output: &mut impl Write, path: &Path) -> io::Result<String> {
    writeln!(output, "captcha saved to {}", path.display())?;
    write!(output, "captcha value: ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "no captcha value entered",
        ));
    }

    Ok(line.trim().to_owned())
}
