//! HTTP server hosting the control API.

use std::net::{IpAddr, SocketAddr, TcpListener};

use tokio::sync::mpsc;

use crate::context::ApiContext;
use crate::error::ServerError;
use crate::routes;

/// The control API bound to a local port.
///
/// The server picks the first free port in a configured range, serves the
/// routes from [`routes::routes`] and shuts down gracefully, letting
/// in-flight requests finish. Open event streams are closed first.
///
/// # Example
///
/// ```no_run
/// # use control_server::{ApiContext, ControlServer};
/// # async fn example(ctx: ApiContext) -> Result<(), control_server::ServerError> {
/// let server = ControlServer::start("0.0.0.0".parse().unwrap(), (8080, 8090), ctx).await?;
/// println!("control API at http://{}", server.local_addr());
///
/// server.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct ControlServer {
    addr: SocketAddr,
    ctx: ApiContext,
    shutdown_tx: Option<mpsc::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ControlServer {
    /// Bind and start serving.
    ///
    /// Returns once the listener is accepting connections.
    pub async fn start(
        host: IpAddr,
        port_range: (u16, u16),
        ctx: ApiContext,
    ) -> Result<Self, ServerError> {
        let (start, end) = port_range;
        if start > end {
            return Err(ServerError::InvalidPortRange { start, end });
        }
        let port = Self::find_available_port(host, start, end)
            .ok_or(ServerError::NoAvailablePort { start, end })?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let (ready_tx, mut ready_rx) = mpsc::channel::<SocketAddr>(1);

        let server_handle = Self::start_server(
            SocketAddr::new(host, port),
            ctx.clone(),
            shutdown_rx,
            ready_tx,
        )?;

        let addr = ready_rx.recv().await.ok_or(ServerError::StartFailed)?;
        tracing::info!(%addr, "control API listening");

        Ok(Self {
            addr,
            ctx,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        self.ctx.close();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.server_handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "control API task ended abnormally");
            }
        }
        tracing::info!("control API stopped");
    }

    fn find_available_port(host: IpAddr, start: u16, end: u16) -> Option<u16> {
        (start..=end).find(|&port| Self::is_port_available(host, port))
    }

    fn is_port_available(host: IpAddr, port: u16) -> bool {
        TcpListener::bind(SocketAddr::new(host, port)).is_ok()
    }

    fn start_server(
        addr: SocketAddr,
        ctx: ApiContext,
        mut shutdown_rx: mpsc::Receiver<()>,
        ready_tx: mpsc::Sender<SocketAddr>,
    ) -> Result<tokio::task::JoinHandle<()>, ServerError> {
        // The port may have been taken between probing and binding
        let (bound, server) = warp::serve(routes::routes(ctx))
            .try_bind_with_graceful_shutdown(addr, async move {
                shutdown_rx.recv().await;
            })
            .map_err(|err| {
                tracing::error!(%addr, error = %err, "failed to bind control API");
                ServerError::StartFailed
            })?;

        Ok(tokio::spawn(async move {
            let _ = ready_tx.send(bound).await;
            server.await;
        }))
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.ctx.close();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
    }
}
