//! Final verdict record produced by each harness.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of one benchmark run. `Success` maps to exit code 0; every other
/// variant names a specific failure kind for automated consumers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    /// The measured CPU load never settled near the requested target.
    TargetLoadNotReached,
    /// Deadline overruns exceeded what the mark tolerates.
    ExcessiveOverruns,
    /// The voice renderer failed mid-run; the run was aborted early.
    RendererFailed,
}

impl ResultCode {
    /// Numeric convention: 0 = pass, non-zero = specific failure kind.
    pub fn value(self) -> i32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::TargetLoadNotReached => 1,
            ResultCode::ExcessiveOverruns => 2,
            ResultCode::RendererFailed => 3,
        }
    }
}

/// One named numeric measurement for automated comparison.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: f64,
}

/// Immutable record built once at harness completion.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SynthMarkResult {
    code: ResultCode,
    message: String,
    metrics: Vec<Metric>,
}

impl SynthMarkResult {
    pub fn new(code: ResultCode, message: String, metrics: Vec<Metric>) -> Self {
        Self {
            code,
            message,
            metrics,
        }
    }

    pub fn result_code(&self) -> ResultCode {
        self.code
    }

    /// Human-readable multi-line report.
    pub fn result_message(&self) -> &str {
        &self.message
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Look up a raw metric by name.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value)
    }
}

/// Collects metrics and report lines as a mark finalizes.
#[derive(Debug, Default)]
pub struct ResultBuilder {
    lines: Vec<String>,
    metrics: Vec<Metric>,
}

impl ResultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a free-form report line.
    pub fn line(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines.push(text.into());
        self
    }

    /// Add a named metric and echo it into the report.
    pub fn metric(&mut self, name: &str, value: f64) -> &mut Self {
        self.lines.push(format!("{name} = {value:.6}"));
        self.metrics.push(Metric {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn build(self, code: ResultCode) -> SynthMarkResult {
        let mut message = self.lines.join("\n");
        message.push('\n');
        SynthMarkResult::new(code, message, self.metrics)
    }
}
