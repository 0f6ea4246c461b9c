//! Sources, zones, groups and intent submission

use std::convert::Infallible;

use warp::reply::Response;
use warp::{Filter, Rejection};

use audiopi_orchestrator::IntentRequest;
use audiopi_state::{GroupId, SourceId, StateSnapshot, ZoneId};

use super::{json_body, with_context};
use crate::context::ApiContext;
use crate::error::ApiError;
use crate::reply;

pub fn routes(
    ctx: ApiContext,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone + Send + Sync + 'static {
    let list_sources = warp::path!("api" / "sources")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(list_sources);

    let get_source = warp::path!("api" / "sources" / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(get_source);

    let list_zones = warp::path!("api" / "zones")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(list_zones);

    let get_zone = warp::path!("api" / "zones" / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(get_zone);

    let list_groups = warp::path!("api" / "groups")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(list_groups);

    let get_group = warp::path!("api" / "groups" / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(get_group);

    let snapshot = warp::path!("api" / "snapshot")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(snapshot);

    let submit = warp::path!("api" / "intents")
        .and(warp::post())
        .and(json_body::<IntentRequest>())
        .and(with_context(ctx))
        .and_then(submit_intent);

    list_sources
        .or(get_source)
        .unify()
        .or(list_zones)
        .unify()
        .or(get_zone)
        .unify()
        .or(list_groups)
        .unify()
        .or(get_group)
        .unify()
        .or(snapshot)
        .unify()
        .or(submit)
        .unify()
}

async fn list_sources(ctx: ApiContext) -> Result<Response, Infallible> {
    Ok(reply::ok(ctx.sources.list_sources()))
}

async fn get_source(id: String, ctx: ApiContext) -> Result<Response, Infallible> {
    let id = SourceId::from(id);
    Ok(reply::respond(ctx.sources.get_source(&id).map_err(ApiError::from)))
}

async fn list_zones(ctx: ApiContext) -> Result<Response, Infallible> {
    Ok(reply::ok(ctx.zones.list_zones()))
}

async fn get_zone(id: String, ctx: ApiContext) -> Result<Response, Infallible> {
    let id = ZoneId::from(id);
    Ok(reply::respond(ctx.zones.get_zone(&id).map_err(ApiError::from)))
}

async fn list_groups(ctx: ApiContext) -> Result<Response, Infallible> {
    Ok(reply::ok(ctx.zones.list_groups()))
}

async fn get_group(id: String, ctx: ApiContext) -> Result<Response, Infallible> {
    let id = GroupId::from(id);
    Ok(reply::respond(ctx.zones.get_group(&id).map_err(ApiError::from)))
}

async fn snapshot(ctx: ApiContext) -> Result<Response, Infallible> {
    Ok(reply::ok(StateSnapshot::capture(&ctx.sources, &ctx.zones)))
}

async fn submit_intent(request: IntentRequest, ctx: ApiContext) -> Result<Response, Infallible> {
    let intent = request.intent.name();
    tracing::debug!(intent, "intent received");
    let result = ctx.engine.submit(request).await.map_err(ApiError::from);
    Ok(reply::respond(result))
}
