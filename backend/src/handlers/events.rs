//! Server-sent change events

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::AppState;

/// GET /references/events - live change stream
///
/// A client that falls behind misses events and should reload the listing;
/// a `resynced` event is also sent whenever the server reloads its own copy.
pub async fn reference_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("New SSE client connected");

    let stream = BroadcastStream::new(state.live.subscribe()).filter_map(|result| async move {
        match result {
            Ok(event) => match Event::default().event(event.name()).json_data(&event) {
                Ok(sse_event) => Some(Ok(sse_event)),
                Err(e) => {
                    tracing::warn!("Failed to serialize change event: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("SSE client lagged: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(state.config.events.keep_alive_secs))
            .text("keep-alive"),
    )
}
