//! Event replay and the live SSE stream
//!
//! `GET /api/events?since=N` first replays buffered events with `seq > N`,
//! then follows the bus live. When events after `N` were already evicted,
//! or a slow client lags behind the broadcast channel, a `gap` event tells
//! the client to resync from `GET /api/snapshot`.

use std::convert::Infallible;

use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use warp::reply::Response;
use warp::sse::Event;
use warp::{Filter, Rejection, Reply};

use audiopi_state::{EventBus, EventEnvelope};

use super::with_context;
use crate::context::ApiContext;
use crate::reply;

#[derive(Debug, Default, Deserialize)]
pub struct SinceQuery {
    pub since: Option<u64>,
}

/// Payload of a `gap` SSE event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    /// Cursor the client asked to resume from
    pub requested: u64,
    /// Oldest sequence number still delivered, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resumed_at: Option<u64>,
    /// Events skipped because the client fell behind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missed: Option<u64>,
}

pub fn routes(
    ctx: ApiContext,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone + Send + Sync + 'static {
    let history = warp::path!("api" / "events" / "history")
        .and(warp::get())
        .and(warp::query::<SinceQuery>())
        .and(with_context(ctx.clone()))
        .and_then(history);

    let stream = warp::path!("api" / "events")
        .and(warp::get())
        .and(warp::query::<SinceQuery>())
        .and(warp::header::optional::<u64>("last-event-id"))
        .and(with_context(ctx))
        .and_then(subscribe);

    history.or(stream).unify()
}

async fn history(query: SinceQuery, ctx: ApiContext) -> Result<Response, Infallible> {
    Ok(reply::ok(ctx.bus().since(query.since.unwrap_or(0))))
}

async fn subscribe(
    query: SinceQuery,
    last_event_id: Option<u64>,
    ctx: ApiContext,
) -> Result<Response, Infallible> {
    // An explicit query wins over a reconnecting browser's header
    let cursor = query.since.or(last_event_id);
    let events = event_stream(ctx.bus(), cursor)
        .take_until(ctx.closed())
        .map(Ok::<_, Infallible>);
    Ok(warp::sse::reply(warp::sse::keep_alive().stream(events)).into_response())
}

/// Replay after `cursor` (or start live when `None`), then follow the bus
pub fn event_stream(bus: &EventBus, cursor: Option<u64>) -> impl Stream<Item = Event> + Send {
    let cursor = cursor.unwrap_or_else(|| bus.last_seq());
    let (page, receiver) = bus.subscribe_since(cursor);

    let mut backlog = Vec::with_capacity(page.events.len() + 1);
    if page.truncated {
        let gap = Gap {
            requested: cursor,
            resumed_at: page.events.first().map(|e| e.seq),
            missed: None,
        };
        tracing::debug!(cursor, resumed_at = ?gap.resumed_at, "replay truncated");
        backlog.push(gap_event(&gap));
    }
    backlog.extend(page.events.iter().map(envelope_event));

    let live = BroadcastStream::new(receiver).map(move |item| match item {
        Ok(envelope) => envelope_event(&envelope),
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            tracing::warn!(missed, "event subscriber lagged");
            gap_event(&Gap {
                requested: cursor,
                resumed_at: None,
                missed: Some(missed),
            })
        }
    });

    stream::iter(backlog).chain(live)
}

fn envelope_event(envelope: &EventEnvelope) -> Event {
    Event::default()
        .id(envelope.seq.to_string())
        .event(envelope.event.name())
        .json_data(envelope)
        .unwrap_or_else(|err| Event::default().comment(format!("unserializable event: {}", err)))
}

fn gap_event(gap: &Gap) -> Event {
    Event::default()
        .event("gap")
        .json_data(gap)
        .unwrap_or_else(|err| Event::default().comment(format!("unserializable gap: {}", err)))
}
