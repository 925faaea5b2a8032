use std::sync::Arc;

use axum::{
    body::StreamBody,
    extract::{RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::color::XorShift64;
use crate::config::AppConfig;
use crate::error::{Result, StreamError};
use crate::session::{self, Session};
use crate::source::{fetch_frames, FrameSource};
use crate::streamer::FrameStreamer;

/// Frames buffered per response before a slow client is cut off.
const BODY_BUFFER: usize = 32;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn FrameSource>,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(source: impl FrameSource + 'static, config: AppConfig) -> Self {
        AppState {
            source: Arc::new(source),
            config: Arc::new(config),
        }
    }
}

/// Build the router: `/healthcheck`, everything else streams the animation.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .fallback(animate)
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn healthcheck() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// `"true"` in any case enables flipping; anything else, or nothing, does not.
pub fn parse_flip(value: Option<&str>) -> bool {
    value.map_or(false, |v| v.eq_ignore_ascii_case("true"))
}

/// First `flip` value of a raw query string. Repeated keys never reject the
/// request; later values are ignored.
pub fn flip_param(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "flip")
        .map(|(_, value)| value.into_owned())
}

/// A request with a User-Agent that does not carry the CLI marker comes from a
/// browser. Requests without a User-Agent, or with an empty one, are streamed.
fn is_browser(headers: &HeaderMap, cli_marker: &str) -> bool {
    match headers.get(header::USER_AGENT) {
        Some(agent) if agent.is_empty() => false,
        Some(agent) => !agent
            .to_str()
            .map(|a| a.contains(cli_marker))
            .unwrap_or(false),
        None => false,
    }
}

async fn animate(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    if is_browser(&headers, &state.config.cli_marker) {
        tracing::debug!("redirecting non-cli client to {}", state.config.redirect_url);
        return (
            StatusCode::FOUND,
            [(header::LOCATION, state.config.redirect_url.clone())],
        )
            .into_response();
    }

    let flip = parse_flip(flip_param(query.as_deref()).as_deref());
    match start_stream(&state, flip).await {
        Ok(rx) => {
            let body = StreamBody::new(futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            }));
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Error: {}", e);
            e.into_response()
        }
    }
}

/// Fetch the frames, then spawn the session driver. Returns the receiving end
/// of the body channel.
async fn start_stream(state: &AppState, flip: bool) -> Result<mpsc::Receiver<Result<Bytes>>> {
    let frames = fetch_frames(state.source.as_ref(), state.config.frame_count).await?;
    let stream_cfg = &state.config.stream;
    let streamer = FrameStreamer::new(frames, flip, stream_cfg, XorShift64::from_entropy())?;
    let (sink, rx) = session::channel(BODY_BUFFER);
    tokio::spawn(session::drive(Session::new(streamer, sink), stream_cfg.interval));
    Ok(rx)
}

/// Failures before streaming starts become a plain-text 500.
impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", self)).into_response()
    }
}
