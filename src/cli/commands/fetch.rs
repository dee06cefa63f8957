//! Fetch command - resolve one request through the active generation

use crate::cli::args::FetchArgs;
use crate::config::{Config, ConfigManager};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::host::Host;
use crate::http::{Request, Response};
use crate::worker::ShellManifest;
use std::io::Write;
use tracing::{info, warn};

/// Execute the fetch command
///
/// The body goes to stdout untouched; where it came from is logged.
pub async fn execute(
    args: FetchArgs,
    config: &Config,
    manager: &ConfigManager,
) -> ShellcacheResult<()> {
    let origin = ShellManifest::origin(config)?;
    let request = args
        .headers
        .into_iter()
        .fold(Request::parse(args.method, &args.url, Some(&origin))?, |req, (k, v)| {
            req.with_header(k, v)
        });

    let host = Host::new(config, manager);
    let outcome = host.fetch(&request).await?;

    info!(
        "{} {} -> {} from {}",
        request.method, request.url, outcome.response.status, outcome.source
    );
    if !outcome.response.is_ok() {
        warn!("{} answered HTTP {}", request.url, outcome.response.status);
    }

    let mut stdout = std::io::stdout().lock();
    write_response(&mut stdout, &outcome.response, args.include)
        .map_err(|e| ShellcacheError::io("writing response to stdout", e))
}

fn write_response(out: &mut impl Write, response: &Response, include: bool) -> std::io::Result<()> {
    if include {
        writeln!(out, "HTTP {}", response.status)?;
        for (name, value) in &response.headers {
            writeln!(out, "{}: {}", name, value)?;
        }
        writeln!(out)?;
    }
    out.write_all(&response.body)?;
    out.flush()
}
