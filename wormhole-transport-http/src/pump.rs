/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Inbound side of the tunnel.
//!
//! One accept loop per pump. Each accepted connection takes a concurrency permit and is
//! served on a tracked task, so `stop` can wait for every in-flight receive to finish.

use crate::circuit_breaker::RepeatedFailuresCircuitBreaker;
use crate::wire;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use wormhole_gateway::observability::{events, fields};
use wormhole_gateway::{
    CriticalErrorAction, Envelope, GatewayError, MessageReceiver, ReceiveOutcome,
};

const COMPONENT: &str = "http_pump";

#[derive(Clone, Debug)]
pub(crate) struct PumpSettings {
    pub(crate) queue_path: String,
    pub(crate) max_concurrency: usize,
    pub(crate) breaker_window: Duration,
    pub(crate) breaker_pause: Duration,
}

struct RunningPump {
    cancel: CancellationToken,
    tracker: TaskTracker,
    listen_task: JoinHandle<()>,
}

pub(crate) struct MessagePump {
    settings: PumpSettings,
    running: Mutex<Option<RunningPump>>,
}

impl MessagePump {
    pub(crate) fn new(settings: PumpSettings) -> Self {
        Self {
            settings,
            running: Mutex::new(None),
        }
    }

    pub(crate) async fn start(
        &self,
        listener: TcpListener,
        receiver: Arc<dyn MessageReceiver>,
        critical_error: CriticalErrorAction,
    ) -> Result<(), GatewayError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(GatewayError::configuration(format!(
                "Message pump for {} is already running",
                self.settings.queue_path
            )));
        }

        let local_addr = listener
            .local_addr()
            .map_err(|err| GatewayError::transport(format!("Listener has no local address: {err}")))?;

        let context = Arc::new(ReceiveContext {
            queue_path: self.settings.queue_path.clone(),
            receiver,
            breaker: RepeatedFailuresCircuitBreaker::new(
                "Receive",
                self.settings.breaker_window,
                self.settings.breaker_pause,
                critical_error.clone(),
            ),
        });
        let listen_breaker = RepeatedFailuresCircuitBreaker::new(
            "Listen",
            self.settings.breaker_window,
            self.settings.breaker_pause,
            critical_error,
        );

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let concurrency = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));

        info!(
            event = events::PUMP_LISTENING,
            component = COMPONENT,
            local_addr = %local_addr,
            queue_path = self.settings.queue_path.as_str(),
            max_concurrency = self.settings.max_concurrency,
            "tunnel pump listening"
        );

        let listen_task = tokio::spawn(listen(
            listener,
            context,
            listen_breaker,
            concurrency,
            cancel.clone(),
            tracker.clone(),
        ));

        *running = Some(RunningPump {
            cancel,
            tracker,
            listen_task,
        });
        Ok(())
    }

    /// Stops accepting, lets open connections finish their current request and waits for
    /// every tracked receive.
    pub(crate) async fn stop(&self) -> Result<(), GatewayError> {
        let Some(pump) = self.running.lock().await.take() else {
            return Ok(());
        };

        info!(
            event = events::PUMP_STOPPING,
            component = COMPONENT,
            queue_path = self.settings.queue_path.as_str(),
            in_flight = pump.tracker.len(),
            "stopping tunnel pump"
        );

        pump.cancel.cancel();
        let listen_result = pump.listen_task.await;
        pump.tracker.close();
        pump.tracker.wait().await;

        info!(
            event = events::PUMP_DRAINED,
            component = COMPONENT,
            queue_path = self.settings.queue_path.as_str(),
            "tunnel pump drained"
        );

        listen_result
            .map_err(|err| GatewayError::transport(format!("Accept loop ended abnormally: {err}")))
    }
}

async fn listen(
    listener: TcpListener,
    context: Arc<ReceiveContext>,
    breaker: RepeatedFailuresCircuitBreaker,
    concurrency: Arc<Semaphore>,
    cancel: CancellationToken,
    tracker: TaskTracker,
) {
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(accepted) => {
                breaker.success();
                accepted
            }
            Err(err) => {
                let err = GatewayError::transport(format!("Unable to accept connection: {err}"));
                warn!(
                    event = events::PUMP_ACCEPT_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "accept failed"
                );
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = breaker.failure(&err) => continue,
                }
            }
        };

        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = concurrency.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let context = context.clone();
        let cancel = cancel.clone();
        tracker.spawn(async move {
            serve_connection(stream, peer, context, cancel).await;
            drop(permit);
        });
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    context: Arc<ReceiveContext>,
    cancel: CancellationToken,
) {
    let service = service_fn(move |request: Request<Incoming>| {
        let context = context.clone();
        async move { Ok::<_, Infallible>(context.handle(request).await) }
    });

    let connection = http1::Builder::new()
        .keep_alive(false)
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = cancel.cancelled() => {
            connection.as_mut().graceful_shutdown();
            connection.as_mut().await
        }
    };

    if let Err(err) = result {
        debug!(
            event = events::PUMP_CONNECTION_FAILED,
            component = COMPONENT,
            peer = %peer,
            err = %err,
            "connection ended with error"
        );
    }
}

struct ReceiveContext {
    queue_path: String,
    receiver: Arc<dyn MessageReceiver>,
    breaker: RepeatedFailuresCircuitBreaker,
}

impl ReceiveContext {
    async fn handle(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        let Some(id) = message_id(&self.queue_path, request.uri().path()).map(str::to_string) else {
            debug!(
                event = events::PUMP_REQUEST_OUTSIDE_QUEUE,
                component = COMPONENT,
                queue_path = self.queue_path.as_str(),
                path = request.uri().path(),
                "request outside queue path"
            );
            return status_response(StatusCode::NOT_FOUND);
        };

        match self.receive(&id, request).await {
            Ok(ReceiveOutcome::Accepted) => {
                self.breaker.success();
                status_response(StatusCode::OK)
            }
            Ok(ReceiveOutcome::RetryRequired) => {
                self.breaker.success();
                status_response(StatusCode::SERVICE_UNAVAILABLE)
            }
            Err(err) => {
                error!(
                    event = events::PUMP_RECEIVE_FAILED,
                    component = COMPONENT,
                    msg_id = id.as_str(),
                    err = %err,
                    "unable to receive message"
                );
                self.breaker.failure(&err).await;
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    async fn receive(
        &self,
        id: &str,
        request: Request<Incoming>,
    ) -> Result<ReceiveOutcome, GatewayError> {
        let id = urlencoding::decode(id)
            .map_err(|err| GatewayError::protocol(format!("Undecodable message id '{id}': {err}")))?;
        let (parts, body) = request.into_parts();
        let headers = wire::decode_headers(&parts.headers)?;
        let immediate_failures = wire::immediate_failures(&parts.headers)?;
        let body = body
            .collect()
            .await
            .map_err(|err| GatewayError::transport(format!("Unable to read request body: {err}")))?
            .to_bytes();

        let envelope = Envelope::new(id.into_owned(), headers, body);
        debug!(
            component = COMPONENT,
            msg_id = %fields::format_message_id(&envelope),
            enclosed_types = %fields::format_enclosed_types(&envelope),
            immediate_failures,
            "received message"
        );
        Ok(self.receiver.receive(envelope, immediate_failures).await)
    }
}

/// The part of `path` after `queue_path`, or `None` when the request is not addressed to
/// this queue or names no message.
fn message_id<'a>(queue_path: &str, path: &'a str) -> Option<&'a str> {
    let remainder = path.strip_prefix(queue_path.trim_end_matches('/'))?;
    if !remainder.is_empty() && !remainder.starts_with('/') {
        return None;
    }
    let id = remainder.trim_matches('/');
    (!id.is_empty()).then_some(id)
}

fn status_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
