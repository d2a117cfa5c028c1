use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::Response;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::state::AppState;

use super::{authenticate, error_response};

// GET /api/notifications — SSE stream of the calling actor's notifications
#[derive(Deserialize)]
pub struct SseQuery {
    pub last_id: Option<i64>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, Response> {
    // The recipient is whoever the gateway authenticated, never a caller-chosen id.
    let recipient = authenticate(&headers, &state)?.id;
    let last_id = query.last_id.unwrap_or(0);

    // Subscribe before the catch-up read so nothing falls in between.
    let rx = state.notification_tx.subscribe();

    let catchup = {
        let db = state
            .db
            .lock()
            .map_err(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable"))?;
        queries::get_notifications_since(&db, &recipient, last_id).unwrap_or_else(|e| {
            tracing::error!(error = %e, recipient_id = %recipient, "failed to load missed notifications");
            vec![]
        })
    };
    let newest_seen = catchup.last().map(|n| n.id).unwrap_or(last_id);

    let catchup_stream = tokio_stream::iter(catchup.into_iter().map(|notification| {
        let data = serde_json::to_string(&notification).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().data(data).event("notification"))
    }));

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(notification)
            if notification.event.recipient_id == recipient && notification.id > newest_seen =>
        {
            let data = serde_json::to_string(&notification).unwrap_or_default();
            Some(Ok(Event::default().data(data).event("notification")))
        }
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "notification subscriber lagged");
            None
        }
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    let combined = catchup_stream.chain(live_stream);
    let merged = StreamExt::merge(combined, keepalive_stream);

    Ok(Sse::new(merged))
}
