//! Budget declaration and enforcement.
//!
//! A program's `budget` header is read into a [`Budget`]; the evaluator
//! carries a [`BudgetTracker`] that counts consumption against it. Every
//! field uses zero to mean "no limit". The iteration counter is shared
//! across all iteration constructs (`for`, `filter`, `loop`, `map`,
//! `reduce`) within one run.

use std::{fmt, time::Instant};

use serde::{Deserialize, Serialize};

/// Declared resource limits, all optional (0 = unlimited).
///
/// Serializes with the header's field spelling (`timeMs`, `maxToolCalls`,
/// ...), which is also the spelling used by policy-file `limits` blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Budget {
    pub time_ms: u64,
    pub max_tool_calls: u64,
    pub max_bytes_written: u64,
    pub max_iterations: u64,
}

impl Budget {
    /// Known header keys, in the order they are documented.
    pub const KEYS: [&'static str; 4] = ["timeMs", "maxToolCalls", "maxBytesWritten", "maxIterations"];

    pub fn set(&mut self, key: &str, value: u64) -> bool {
        match key {
            "timeMs" => self.time_ms = value,
            "maxToolCalls" => self.max_tool_calls = value,
            "maxBytesWritten" => self.max_bytes_written = value,
            "maxIterations" => self.max_iterations = value,
            _ => return false,
        }
        true
    }

    /// Applies a host-imposed ceiling: where the ceiling is set, the
    /// effective limit is the declared limit clamped to it (an undeclared
    /// limit inherits the ceiling).
    #[must_use]
    pub fn clamped_by(&self, ceiling: &Self) -> Self {
        fn clamp(declared: u64, cap: u64) -> u64 {
            match (declared, cap) {
                (_, 0) => declared,
                (0, c) => c,
                (d, c) => d.min(c),
            }
        }
        Self {
            time_ms: clamp(self.time_ms, ceiling.time_ms),
            max_tool_calls: clamp(self.max_tool_calls, ceiling.max_tool_calls),
            max_bytes_written: clamp(self.max_bytes_written, ceiling.max_bytes_written),
            max_iterations: clamp(self.max_iterations, ceiling.max_iterations),
        }
    }
}

/// Which budget was exhausted, with the limit and the observed count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetError {
    Time { limit_ms: u64, elapsed_ms: u64 },
    ToolCalls { limit: u64, count: u64 },
    BytesWritten { limit: u64, total: u64 },
    Iterations { limit: u64, count: u64 },
}

impl fmt::Display for BudgetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time { limit_ms, elapsed_ms } => {
                write!(f, "time budget exceeded: {elapsed_ms}ms > {limit_ms}ms")
            }
            Self::ToolCalls { limit, count } => {
                write!(f, "tool call budget exceeded: {count} > {limit}")
            }
            Self::BytesWritten { limit, total } => {
                write!(f, "bytes-written budget exceeded: {total} > {limit}")
            }
            Self::Iterations { limit, count } => {
                write!(f, "iteration budget exceeded: {count} > {limit}")
            }
        }
    }
}

impl std::error::Error for BudgetError {}

/// Mutable consumption counters for one run.
///
/// The start instant is recorded at construction, so build the tracker
/// immediately before execution begins.
#[derive(Debug)]
pub struct BudgetTracker {
    limits: Budget,
    started: Instant,
    tool_calls: u64,
    bytes_written: u64,
    iterations: u64,
}

impl BudgetTracker {
    #[must_use]
    pub fn new(limits: Budget) -> Self {
        Self {
            limits,
            started: Instant::now(),
            tool_calls: 0,
            bytes_written: 0,
            iterations: 0,
        }
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Wall-clock check, called at statement boundaries and after tool and
    /// stdlib calls.
    pub fn check_time(&self) -> Result<(), BudgetError> {
        if self.limits.time_ms == 0 {
            return Ok(());
        }
        let elapsed_ms = self.elapsed_ms();
        if elapsed_ms > self.limits.time_ms {
            return Err(BudgetError::Time {
                limit_ms: self.limits.time_ms,
                elapsed_ms,
            });
        }
        Ok(())
    }

    /// Counts one iteration of any iteration construct.
    pub fn on_iteration(&mut self) -> Result<(), BudgetError> {
        self.iterations += 1;
        if self.limits.max_iterations != 0 && self.iterations > self.limits.max_iterations {
            return Err(BudgetError::Iterations {
                limit: self.limits.max_iterations,
                count: self.iterations,
            });
        }
        Ok(())
    }

    /// Counts one tool invocation (`call?` and `do` alike).
    pub fn on_tool_call(&mut self) -> Result<(), BudgetError> {
        self.tool_calls += 1;
        if self.limits.max_tool_calls != 0 && self.tool_calls > self.limits.max_tool_calls {
            return Err(BudgetError::ToolCalls {
                limit: self.limits.max_tool_calls,
                count: self.tool_calls,
            });
        }
        Ok(())
    }

    /// Accumulates a tool result's reported `bytes` field.
    pub fn on_bytes(&mut self, bytes: u64) -> Result<(), BudgetError> {
        self.bytes_written = self.bytes_written.saturating_add(bytes);
        if self.limits.max_bytes_written != 0 && self.bytes_written > self.limits.max_bytes_written {
            return Err(BudgetError::BytesWritten {
                limit: self.limits.max_bytes_written,
                total: self.bytes_written,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn tool_calls(&self) -> u64 {
        self.tool_calls
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}
