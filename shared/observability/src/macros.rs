//! Convenience macros for common logging patterns.

/// Log a timed operation (measures and logs duration)
#[macro_export]
macro_rules! log_timed {
    ($name:expr, $block:expr) => {{
        let start = std::time::Instant::now();
        let result = $block;
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(target: "timing", operation = $name, duration_ms = duration_ms, "operation completed");
        result
    }};
}

/// Log a call to a monitored node
#[macro_export]
macro_rules! log_node_call {
    ($application:expr, $node:expr) => {
        tracing::debug!(target: "node", application = %$application, node = %$node, "contacting node");
    };
    ($application:expr, $node:expr, $duration_ms:expr, $status:expr) => {
        tracing::debug!(target: "node", application = %$application, node = %$node, duration_ms = $duration_ms, status = %$status, "node call completed");
    };
}
