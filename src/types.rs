use std::str::FromStr;
use serde::Deserialize;

/// How task output is reached on this host.
///
/// - `Socket`: per-stream unix domain sockets inside the task's job directory.
/// - `File`: per-stream log files under the container's `logs` directory,
///   followed like `tail -f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamBackend {
    Socket,
    File,
}

impl Default for StreamBackend {
    fn default() -> Self {
        if cfg!(unix) {
            StreamBackend::Socket
        } else {
            StreamBackend::File
        }
    }
}

impl FromStr for StreamBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "socket" => Ok(StreamBackend::Socket),
            "file" => Ok(StreamBackend::File),
            other => Err(format!(
                "invalid backend: {other} (expected \"socket\" or \"file\")"
            )),
        }
    }
}
