use axum::{
    debug_handler,
    extract::{Path, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, realtime::Notifier, session};

/// Subscribes the session to a page's scope. Push only: deltas flow out as
/// JSON text frames, inbound frames are drained and dropped. A lagged
/// receiver is disconnected rather than given a stream with a hole in it;
/// the client reconnects and re-hydrates through `joinPage`.
#[debug_handler(state = AppState)]
pub(crate) async fn page_ws(
    Path(page_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(notifier): State<Notifier>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    session::require_user(&session).await?;
    let origin = session::origin_of(&session);

    if super::page_by_id(&db_pool, &page_id).await?.is_none() {
        return Err(AppError::NotFound("page"));
    }

    let mut rx = notifier.subscribe(&page_id).await;

    Ok(ws
        .on_upgrade(async move |stream| {
            let (mut sender, mut receiver) = stream.split();

            let forward_task = tokio::spawn(async move {
                loop {
                    let Ok(envelope) = rx.recv().await else {
                        break;
                    };

                    // the mutating session already patched itself from its
                    // own response
                    if envelope.origin.is_some() && envelope.origin == origin {
                        continue;
                    }

                    let Ok(frame) = serde_json::to_string(&envelope.event) else {
                        continue;
                    };
                    if sender.send(frame.into()).await.is_err() {
                        break;
                    }
                }
            });

            while let Some(Ok(_)) = receiver.next().await {}
            forward_task.abort();
        })
        .into_response())
}
