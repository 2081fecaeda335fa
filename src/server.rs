use std::net::{Ipv4Addr, SocketAddr};

use axum::Router;
use axum::routing::get_service;
use camino::Utf8Path;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

use crate::error::{HarnessError, HarnessResult};
use crate::session::pick_free_port;

/// A self-hosted static file server for one scenario run. Binding the
/// listener before the handle is returned is the startup guarantee: by the
/// time navigation begins the port is accepting connections.
pub struct StaticServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

pub async fn start_static_server(dir: &Utf8Path, requested_port: u16) -> HarnessResult<StaticServer> {
    if !dir.is_dir() {
        return Err(HarnessError::Server(format!(
            "static directory not found at {dir}"
        )));
    }

    let router = Router::new().fallback_service(get_service(ServeDir::new(dir.as_std_path())));

    let port = if requested_port == 0 {
        pick_free_port()?
    } else {
        requested_port
    };

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
        .await
        .map_err(|err| HarnessError::Server(format!("failed to bind port {port}: {err}")))?;
    let addr = listener
        .local_addr()
        .map_err(|err| HarnessError::Server(err.to_string()))?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
        {
            eprintln!("Static server error: {err}");
        }
    });

    Ok(StaticServer {
        addr,
        shutdown: Some(shutdown_tx),
        handle: Some(handle),
    })
}

impl StaticServer {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.addr.ip(), self.addr.port())
    }

    /// Shut the server down and wait for the serve task to finish. Runs on
    /// every exit path of a scenario; `Drop` backstops the shutdown signal
    /// if `stop` was never reached.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
