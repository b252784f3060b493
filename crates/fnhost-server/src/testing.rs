//! Test fixtures.

use fnhost_common::{BuildConfig, RuntimeConfig};
use tempfile::TempDir;

/// Runtime rooted in `dir` whose "toolchain" copies a shell script into an
/// executable artifact. Sources containing `BROKEN` fail to build.
pub fn test_config(dir: &TempDir) -> RuntimeConfig {
    let mut config = RuntimeConfig::default().rooted_at(dir.path());
    config.build = BuildConfig {
        program: "sh".into(),
        args: vec![
            "-c".into(),
            "grep -q BROKEN \"$0\" && { echo \"$0: syntax error\"; exit 1; }; \
             cp \"$0\" \"$1\" && chmod +x \"$1\""
                .into(),
            "{source}".into(),
            "{output}".into(),
        ],
        source_extension: "sh".into(),
        timeout_ms: 5_000,
    };
    config
}

/// A shell script function body.
pub fn script(body: &str) -> Vec<u8> {
    format!("#!/bin/sh\n{body}\n").into_bytes()
}
