//! Pipeline instrumentation behind the `tracing` feature.
//!
//! Spans cover the stages of a run (`synthesize`, `level`, `patch_match`,
//! `upscale`, `apply`); events carry per-sweep errors, knee-point claims and
//! level summaries. With the feature off the spans are [`NoopSpan`]s and
//! event fields are evaluated and dropped.

/// Info span for one pipeline stage, entered with `.entered()`.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Info event with `key = value` fields, e.g. `pass_error`.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
    ($name:expr) => {
        tracing::info!(name: $name)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let _ = ($($value,)+);
    }};
    ($name:expr) => {{}};
}

pub(crate) use trace_event;
pub(crate) use trace_span;

/// Span guard stand-in; `entered` hands it straight back.
#[cfg(not(feature = "tracing"))]
pub(crate) struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    #[inline]
    pub(crate) fn entered(self) -> Self {
        self
    }
}
