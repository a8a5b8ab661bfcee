//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    ChannelInfoResponse, HealthResponse, NotifyChannelRequest, NotifyPairingRequest,
    NotifyResponse, NotifyUserRequest, StatsResponse,
};
use super::handlers;
use crate::domain::ChannelPurpose;
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI specification.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "pairlink-gateway",
        description = "Real-time presence and event-broadcast gateway for paired users"
    ),
    paths(
        handlers::system::health_handler,
        handlers::notify::notify_channel,
        handlers::notify::notify_pairing,
        handlers::notify::notify_user,
        handlers::channels::get_channel,
        handlers::channels::stats,
    ),
    components(schemas(
        ChannelPurpose,
        NotifyChannelRequest,
        NotifyPairingRequest,
        NotifyUserRequest,
        NotifyResponse,
        ChannelInfoResponse,
        StatsResponse,
        HealthResponse,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Notify", description = "Push events to connected clients"),
        (name = "Channels", description = "Inspect live channel membership"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;
