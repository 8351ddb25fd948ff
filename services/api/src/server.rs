//! Process lifecycle for the API service.
//!
//! # Purpose
//! Owns the HTTP listener. `start` returns a handle for the running server;
//! `stop` drains it gracefully and then closes the registry and transport, in
//! that order. `run` is the binary's blocking entry point.
use crate::app::{AppState, build_router};
use anyhow::Result;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct ApiServer {
    state: AppState,
    bind: SocketAddr,
}

impl ApiServer {
    pub fn new(state: AppState, bind: SocketAddr) -> Self {
        Self { state, bind }
    }

    /// Bind the listener and serve in a background task.
    pub async fn start(self) -> Result<ApiHandle> {
        let listener = TcpListener::bind(self.bind).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown, on_shutdown) = oneshot::channel::<()>();
        let app = build_router(self.state.clone());
        let task = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = on_shutdown.await;
            })
            .await
        });
        tracing::info!(%local_addr, "api listening");
        Ok(ApiHandle {
            local_addr,
            shutdown,
            task,
            state: self.state,
        })
    }

    /// Serve until the process receives an interrupt, then drain.
    pub async fn run(self) -> Result<()> {
        let handle = self.start().await?;
        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown signal received");
        handle.stop().await
    }
}

pub struct ApiHandle {
    pub local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
    state: AppState,
}

impl ApiHandle {
    /// Close the listener, then the registry, then the transport.
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.task.await??;
        self.state.registry.close().await;
        self.state.transport.close().await;
        tracing::info!("api stopped");
        Ok(())
    }
}
