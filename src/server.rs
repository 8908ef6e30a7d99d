//! HTTP server exposing the last upgrade window

use crate::config::ServiceConfig;
use crate::schema::UpgradeResponse;
use crate::service::UpgradeService;
use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;
use uuid::Uuid;

pub const LAST_UPGRADE_PATH: &str = "/last-upgrade";

pub struct HistoryServer {
    listener: TcpListener,
    service: UpgradeService,
}

impl HistoryServer {
    /// Bind the listening socket described by `config`
    pub async fn bind(config: &ServiceConfig) -> Result<Self> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind server to {}", addr))?;

        Ok(Self {
            listener,
            service: UpgradeService::from_config(config),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn service(&self) -> &UpgradeService {
        &self.service
    }

    pub async fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        tracing::info!("Server listening on {}", addr);
        tracing::info!(
            "Serving GET http://{}{} from {}",
            addr,
            LAST_UPGRADE_PATH,
            self.service.history_log().display()
        );

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                    continue;
                }
            };
            tracing::debug!("Accepted connection from {}", peer_addr);

            let service = self.service.clone();

            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, service).await {
                    tracing::error!("Connection error from {}: {}", peer_addr, e);
                }
            });
        }
    }

    async fn handle_connection(stream: TcpStream, service: UpgradeService) -> Result<()> {
        let io = TokioIo::new(stream);

        let handler = service_fn(move |req| Self::route(req, service.clone()));

        http1::Builder::new().serve_connection(io, handler).await?;

        Ok(())
    }

    async fn route(
        req: Request<Incoming>,
        service: UpgradeService,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("request", id = %request_id);

        Ok(Self::respond(req, service).instrument(span).await)
    }

    async fn respond(req: Request<Incoming>, service: UpgradeService) -> Response<Full<Bytes>> {
        tracing::info!("{} {}", req.method(), req.uri());

        if req.uri().path() != LAST_UPGRADE_PATH {
            return json_response(
                StatusCode::NOT_FOUND,
                UpgradeResponse::error("not found").to_json(),
            );
        }

        if req.method() != Method::GET {
            return json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                UpgradeResponse::error("method not allowed").to_json(),
            );
        }

        match service.last_upgrade().await {
            Ok(payload) => json_response(StatusCode::OK, payload),
            Err(e) => {
                tracing::error!("Lookup failed: {:#}", e);
                json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UpgradeResponse::error(format!("{:#}", e)).to_json(),
                )
            }
        }
    }
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
