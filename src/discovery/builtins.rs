//! Node.js core modules, which are never installed into a layer.

/// Core modules importable by bare name.
const NODE_BUILTINS: &[&str] = &[
    "_http_agent",
    "_http_client",
    "_http_common",
    "_http_incoming",
    "_http_outgoing",
    "_http_server",
    "_stream_duplex",
    "_stream_passthrough",
    "_stream_readable",
    "_stream_transform",
    "_stream_wrap",
    "_stream_writable",
    "_tls_common",
    "_tls_wrap",
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Core modules that only exist behind the `node:` scheme.
const SCHEME_ONLY_BUILTINS: &[&str] = &["sea", "sqlite", "test", "test/reporters"];

/// Whether `request` names a Node.js core module.
///
/// Accepts bare names (`fs`), the `node:` scheme (`node:fs`) and subpaths of
/// either (`fs/promises`, `node:stream/web`).
#[must_use]
pub fn is_builtin_module(request: &str) -> bool {
    if let Some(rest) = request.strip_prefix("node:") {
        return !rest.is_empty()
            && (is_bare_builtin(rest) || SCHEME_ONLY_BUILTINS.contains(&rest));
    }
    is_bare_builtin(request)
}

fn is_bare_builtin(request: &str) -> bool {
    let root = request.split('/').next().unwrap_or(request);
    NODE_BUILTINS.binary_search(&root).is_ok()
}
