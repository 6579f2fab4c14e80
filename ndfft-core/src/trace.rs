//! Structured records of every kernel dispatch.
//!
//! Each dispatch appends one [`DispatchTrace`] to a process-wide log.
//! Callers drain it with [`take_dispatch_traces`] and may render entries
//! as JSON lines. The log keeps at most [`MAX_TRACES`] entries; older ones
//! are evicted when nobody drains it.

use std::{
    collections::VecDeque,
    fmt::Write,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, OnceLock,
    },
};

/// Capacity of the process-wide trace log.
pub const MAX_TRACES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTrace {
    pub operation_id: String,
    pub operation: &'static str,
    pub backend: &'static str,
    pub dtype: &'static str,
    /// Label of the input array.
    pub label: String,
    pub rank: usize,
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    /// Number of elements the kernel read and wrote.
    pub copied_elements: usize,
    pub parallel_rank: usize,
    pub tile: Vec<usize>,
    pub timing_ns: u128,
}

impl DispatchTrace {
    #[must_use]
    pub fn to_json_line(&self) -> String {
        format!(
            "{{\"operation_id\":\"{}\",\"operation\":\"{}\",\"backend\":\"{}\",\"dtype\":\"{}\",\"label\":\"{}\",\"rank\":{},\"input_shape\":{:?},\"output_shape\":{:?},\"copied_elements\":{},\"parallel_rank\":{},\"tile\":{:?},\"timing_ns\":{}}}",
            self.operation_id,
            self.operation,
            self.backend,
            self.dtype,
            escape_json(&self.label),
            self.rank,
            self.input_shape,
            self.output_shape,
            self.copied_elements,
            self.parallel_rank,
            self.tile,
            self.timing_ns,
        )
    }
}

fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out
}

/// A FIFO of traces that drops its oldest entry once full.
#[derive(Debug)]
pub(crate) struct TraceLog {
    entries: VecDeque<DispatchTrace>,
    capacity: usize,
}

impl TraceLog {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, trace: DispatchTrace) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(trace);
    }

    pub(crate) fn drain(&mut self) -> Vec<DispatchTrace> {
        self.entries.drain(..).collect()
    }
}

static TRACE_LOG: OnceLock<Mutex<TraceLog>> = OnceLock::new();
static OPERATION_COUNTER: AtomicU64 = AtomicU64::new(1);

fn trace_log() -> &'static Mutex<TraceLog> {
    TRACE_LOG.get_or_init(|| Mutex::new(TraceLog::with_capacity(MAX_TRACES)))
}

pub(crate) fn next_operation_id() -> String {
    let next = OPERATION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("ndfft-op-{next:016x}")
}

pub(crate) fn record_trace(trace: DispatchTrace) {
    if let Ok(mut log) = trace_log().lock() {
        log.push(trace);
    }
}

/// Drain and return the traces recorded since the last drain, oldest
/// first. At most [`MAX_TRACES`] are kept.
#[must_use]
pub fn take_dispatch_traces() -> Vec<DispatchTrace> {
    if let Ok(mut log) = trace_log().lock() {
        return log.drain();
    }
    Vec::new()
}
