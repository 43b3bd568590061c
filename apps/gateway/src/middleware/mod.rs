pub mod authorize;
pub mod cors;
pub mod rate_limit;
pub mod request_trace;
pub mod structured_logger;

pub use authorize::Authorize;
pub use cors::cors_middleware;
pub use rate_limit::RateLimit;
pub use request_trace::RequestTrace;
pub use structured_logger::StructuredLogger;

pub mod trace_span;
pub use trace_span::TraceSpan;
