//! Admin data collection on shutdown.
//!
//! Before the worker is signalled, the hook returned by [`admin_data_hook`] downloads a fixed set
//! of admin pages into the run directory, so the archive keeps the proxy's final configuration
//! and statistics next to its logs.

use std::time::Duration;

use tracing::{debug, warn};
use warden_core::{HookError, HookFn, HookRef, ShutdownContext};
use warden_model::AdminAddress;

/// `(file stem, admin path)` pairs fetched on shutdown.
pub const ADMIN_PAGES: &[(&str, &str)] = &[
    ("server_info", "/server_info"),
    ("stats", "/stats?format=json"),
    ("clusters", "/clusters?format=json"),
    ("listeners", "/listeners?format=json"),
    ("config_dump", "/config_dump"),
    ("memory", "/memory"),
    ("certs", "/certs"),
    ("runtime", "/runtime"),
];

/// Shutdown hook saving every [`ADMIN_PAGES`] entry to `<run_dir>/<stem>.json`.
///
/// Individual page failures are logged and the remaining pages are still fetched; the hook then
/// reports the first failure. Collection stops early once the shutdown budget is exhausted.
pub fn admin_data_hook(request_timeout: Duration) -> HookRef {
    HookFn::arc("admin-data", move |ctx: ShutdownContext| {
        collect(ctx, request_timeout)
    })
}

async fn collect(ctx: ShutdownContext, request_timeout: Duration) -> Result<(), HookError> {
    let addr = ctx.admin().resolve()?;
    let client = reqwest::Client::builder()
        .timeout(request_timeout)
        .build()
        .map_err(|e| HookError::failed(format!("http client: {e}")))?;

    let mut first_err = None;
    for (stem, path) in ADMIN_PAGES {
        let res = tokio::select! {
            res = fetch(&client, &addr, path) => res,
            _ = ctx.budget().cancelled() => {
                return Err(HookError::failed("admin data collection ran out of time"));
            }
        };
        let res = match res {
            Ok(body) => tokio::fs::write(ctx.run_dir().join(format!("{stem}.json")), body)
                .await
                .map_err(HookError::from),
            Err(e) => Err(e),
        };
        match res {
            Ok(()) => debug!(target: "warden.exec.collect", page = stem, "admin page saved"),
            Err(e) => {
                warn!(target: "warden.exec.collect", page = stem, error = %e, "admin page not collected");
                first_err.get_or_insert(e);
            }
        }
    }
    first_err.map_or(Ok(()), Err)
}

async fn fetch(client: &reqwest::Client, addr: &AdminAddress, path: &str) -> Result<Vec<u8>, HookError> {
    let url = format!("http://{addr}{path}");
    let fail = |e: reqwest::Error| HookError::failed(format!("GET {url}: {e}"));
    let body = client
        .get(&url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(fail)?
        .bytes()
        .await
        .map_err(fail)?;
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };
    use tokio_util::sync::CancellationToken;
    use warden_core::AdminEndpoint;

    /// Minimal admin endpoint: answers every request with the request path as body,
    /// and 404 for `/certs`.
    async fn fake_admin() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = sock.read(&mut buf).await.unwrap_or(0);
                    let req = String::from_utf8_lossy(&buf[..n]).into_owned();
                    let path = req.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let (status, body) = if path == "/certs" {
                        ("404 Not Found", String::new())
                    } else {
                        ("200 OK", path)
                    };
                    let resp = format!(
                        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = sock.write_all(resp.as_bytes()).await;
                    let _ = sock.shutdown().await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn saves_pages_and_reports_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let admin_path = dir.path().join("admin-address.txt");
        std::fs::write(&admin_path, fake_admin().await).unwrap();

        let ctx = ShutdownContext::new(
            CancellationToken::new(),
            1,
            dir.path(),
            Arc::new(AdminEndpoint::new(&admin_path)),
        );
        let err = admin_data_hook(Duration::from_secs(5))
            .call(ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/certs"));

        let stats = std::fs::read_to_string(dir.path().join("stats.json")).unwrap();
        assert_eq!(stats, "/stats?format=json");
        assert!(dir.path().join("config_dump.json").exists());
        assert!(dir.path().join("runtime.json").exists());
        assert!(!dir.path().join("certs.json").exists());
    }

    #[tokio::test]
    async fn unresolvable_admin_address_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ShutdownContext::new(
            CancellationToken::new(),
            1,
            dir.path(),
            Arc::new(AdminEndpoint::new(dir.path().join("admin-address.txt"))),
        );
        let err = admin_data_hook(Duration::from_secs(1))
            .call(ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Core(_)));
    }
}
