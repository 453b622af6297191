use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::{Stream, StreamExt};
use rail_core::TrainId;
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::AppError;
use crate::extract::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamFilter {
    pub train_id: Option<TrainId>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/events/stream", get(event_stream))
}

/// GET /v1/events/stream[?train_id=N]
/// Live ledger notifications as Server-Sent Events
async fn event_stream(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<StreamFilter>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let rx = state.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let train_filter = filter.train_id;
        async move {
            match result {
                Ok(event) => {
                    if train_filter.is_some_and(|id| id != event.train_id()) {
                        return None;
                    }
                    let data = serde_json::to_string(&event).ok()?;
                    Some(Ok::<_, Infallible>(Event::default().event(event.topic()).data(data)))
                }
                Err(e) => {
                    tracing::warn!("Event stream subscriber fell behind: {}", e);
                    None
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
