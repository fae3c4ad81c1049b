use std::{fmt, io::{self, Write}};
use tracing::debug;

use weathernow_core::{FetchError, IconAsset, PLACEHOLDER, Severity, View, WeatherSnapshot};

/// Draws the results card and status line on a terminal.
#[derive(Debug)]
pub struct TerminalView<W: Write = io::Stdout> {
    out: W,
    failed: bool,
}

impl TerminalView {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    pub fn status(&mut self, text: &str) {
        self.write_line(format_args!("{text}"));
    }

    /// Whether the last thing rendered was an error.
    pub fn failed(&self) -> bool {
        self.failed
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }

    /// Rendering never fails; a broken terminal only shows up in the logs.
    fn write_line(&mut self, line: fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            debug!(error = %err, "terminal write failed");
        }
    }
}

impl<W: Write> View for TerminalView<W> {
    fn render(&mut self, snapshot: &WeatherSnapshot, icon: Option<&IconAsset>) {
        self.failed = false;

        let icon = match icon {
            Some(icon) => format!("Icon: {} ({}x{})", icon.code, icon.width, icon.height),
            None => format!("Icon: {PLACEHOLDER}"),
        };

        self.write_line(format_args!(
            "\n{heading}\n  {icon}\n  {temp}\n  {feels}\n  {cond}\n  {hum:<24}{wind}\n  {pres:<24}{clouds}\n",
            heading = snapshot.heading(),
            temp = snapshot.temperature_line(),
            feels = snapshot.feels_like_line(),
            cond = snapshot.conditions_line(),
            hum = snapshot.humidity_line(),
            wind = snapshot.wind_line(),
            pres = snapshot.pressure_line(),
            clouds = snapshot.clouds_line(),
        ));
    }

    fn render_error(&mut self, error: &FetchError) {
        self.failed = true;

        let marker = match error.severity() {
            Severity::Info => "i",
            Severity::Warning => "!",
            Severity::Error => "x",
        };
        self.write_line(format_args!("[{marker}] {}: {error}", error.title()));
    }
}
