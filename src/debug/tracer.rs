use crate::{errors::RpcErr, types::trace::TraceConfig};

/// Tracers the execution engine implements natively.
const BUILT_IN_TRACERS: [&str; 4] = ["callTracer", "4byteTracer", "prestateTracer", "noopTracer"];

pub fn is_built_in_tracer(tracer: &str) -> bool {
    BUILT_IN_TRACERS.contains(&tracer)
}

/// Heuristic for custom tracer scripts: a usable script is expected to define
/// `result` and `fault` handlers, so both substrings must appear. This does
/// not guarantee the script is actually well-formed.
pub fn is_custom_tracer(tracer: &str) -> bool {
    tracer.contains("result") && tracer.contains("fault")
}

/// Reject unknown tracer names before any execution work happens.
pub fn validate_tracer(config: &TraceConfig) -> Result<(), RpcErr> {
    match config.tracer.as_deref() {
        None | Some("") => Ok(()),
        Some(tracer) if is_built_in_tracer(tracer) || is_custom_tracer(tracer) => Ok(()),
        Some(_) => Err(RpcErr::InvalidTracer),
    }
}
