//! SSE 提醒推送、Web Push 订阅与 VAPID 公钥

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::http::StatusCode;
use actix_web::web::Bytes;
use actix_web::{HttpResponse, HttpResponseBuilder, Responder, Result as ActixResult, web};
use futures_util::Stream;
use futures_util::stream;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{error, info};

use crate::api::middleware::{AuthenticatedUser, resolve_token_user};
use crate::config::get_config;
use crate::services::{Notifiers, ReminderFeed};
use crate::storage::SeaOrmStorage;

use super::error_code::ErrorCode;
use super::helpers::{api_result, error_from_app, error_response, success_response};
use super::types::{
    MessageResponse, StreamQuery, SubscribeBody, UnsubscribeQuery, VapidKeyResponse,
};

const UNAUTHORIZED_EVENT: &str = "data: {\"error\": \"Unauthorized\"}\n\n";
const KEEPALIVE_COMMENT: &[u8] = b": keep-alive\n\n";
const CONNECTED_COMMENT: &[u8] = b": connected\n\n";

fn sse_response() -> HttpResponseBuilder {
    let mut builder = HttpResponse::Ok();
    builder
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"));
    builder
}

struct FeedState {
    feed: ReminderFeed,
    user_id: i32,
    ticker: Interval,
    keepalive: Duration,
    last_write: Instant,
    pending: VecDeque<Bytes>,
}

/// 轮询用户的 DUE 提醒，无事件时定期写注释行保活
fn reminder_events(
    feed: ReminderFeed,
    user_id: i32,
    poll_every: Duration,
    keepalive: Duration,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>> {
    let mut ticker = interval(poll_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let state = FeedState {
        feed,
        user_id,
        ticker,
        keepalive,
        last_write: Instant::now(),
        pending: VecDeque::from([Bytes::from_static(CONNECTED_COMMENT)]),
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(frame) = st.pending.pop_front() {
                st.last_write = Instant::now();
                return Some((Ok(frame), st));
            }

            st.ticker.tick().await;
            match st.feed.poll_due_events(st.user_id).await {
                Ok(events) => {
                    for event in events {
                        match event.to_sse_frame() {
                            Ok(frame) => st.pending.push_back(Bytes::from(frame)),
                            Err(e) => error!("SSE Error: failed to encode reminder {}: {}", event.id, e),
                        }
                    }
                }
                Err(e) => error!("SSE Error: {}", e),
            }

            if st.pending.is_empty() && st.last_write.elapsed() >= st.keepalive {
                st.pending.push_back(Bytes::from_static(KEEPALIVE_COMMENT));
            }
        }
    })
}

/// GET /notifications/stream?token=
///
/// EventSource 不能设置 header，token 通过 query 传入，只在建立连接时校验一次。
pub async fn notification_stream(
    query: web::Query<StreamQuery>,
    storage: web::Data<Arc<SeaOrmStorage>>,
    feed: web::Data<ReminderFeed>,
) -> impl Responder {
    let user = match query.token.as_deref() {
        Some(token) => resolve_token_user(&storage, token).await,
        None => None,
    };

    let Some(user) = user else {
        return sse_response().body(UNAUTHORIZED_EVENT);
    };

    let config = get_config();
    let poll_every = Duration::from_secs(config.notifications.sse_poll_interval_secs.max(1));
    let keepalive = Duration::from_secs(config.notifications.keepalive_secs.max(1));

    info!("SSE stream opened for {}", user.email);
    sse_response().streaming(reminder_events(
        feed.get_ref().clone(),
        user.id,
        poll_every,
        keepalive,
    ))
}

/// POST /subscribe
pub async fn subscribe(
    user: web::ReqData<AuthenticatedUser>,
    body: web::Json<SubscribeBody>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> ActixResult<impl Responder> {
    if let Err(e) = body.validate() {
        return Ok(error_from_app(&e));
    }

    let result = storage
        .upsert_subscription(user.id(), &body.endpoint, &body.keys.p256dh, &body.keys.auth)
        .await
        .map(|_| MessageResponse::new("Subscribed successfully"));
    if result.is_ok() {
        info!("Push subscription registered for {}", user.0.email);
    }
    Ok(api_result(result))
}

/// DELETE /subscribe?endpoint=
pub async fn unsubscribe(
    user: web::ReqData<AuthenticatedUser>,
    query: web::Query<UnsubscribeQuery>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> ActixResult<impl Responder> {
    let result = storage
        .delete_subscription(user.id(), &query.endpoint)
        .await
        .map(|removed| {
            if removed {
                info!("Removed push subscription for {}", user.0.email);
            }
            MessageResponse::new("Unsubscribed successfully")
        });
    Ok(api_result(result))
}

/// GET /vapid-public-key
pub async fn vapid_public_key(notifiers: web::Data<Notifiers>) -> ActixResult<impl Responder> {
    match notifiers.push.public_key() {
        Some(key) => Ok(success_response(VapidKeyResponse {
            public_key: key.to_string(),
        })),
        None => Ok(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::PushNotConfigured,
            "Push notifications not configured",
        )),
    }
}
