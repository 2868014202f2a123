use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::time::MissedTickBehavior;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::config::Config;
use crate::controllers::paste::{HighlightRequest, Retrieved, Submitted};
use crate::error::ApiError;
use crate::escape::escape;
use crate::types::api::{DeleteParams, HighlightParams, PasteResponse, SubmitPaste, UploadPaste};
use crate::{App, Pastes};

/// The manual for the program in man page form.
const MAN_PAGE: &str = include_str!("../../assets/man.txt");

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], app.config.port));

    if let Some(secs) = app.config.limits.reap_interval_secs {
        tokio::spawn(reap_expired(
            app.pastes.clone(),
            Duration::from_secs(secs.max(1)),
        ));
    }

    info!("listening on {addr}");
    axum::Server::bind(&addr)
        .serve(router(app).into_make_service())
        .await?;

    Ok(())
}

pub fn router(app: App) -> Router {
    let max_upload_size = app.config.limits.max_upload_size;
    Router::new()
        .route("/", get(index).post(upload_paste))
        .route("/api", post(submit_paste))
        .route("/api/:id", get(get_paste_json).delete(delete_paste))
        .route("/download/:id", get(download_paste))
        .route("/:id", get(get_paste_raw).delete(delete_paste))
        .route("/:id/:lang", get(get_paste_highlighted))
        .route("/:id/:lang/:style", get(get_paste_highlighted_styled))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_size))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn reap_expired(pastes: Pastes, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(err) = pastes.purge_expired().await {
            warn!("failed to purge expired pastes: {err}");
        }
    }
}

async fn index() -> &'static str {
    MAN_PAGE
}

async fn upload_paste(
    State(config): State<Config>,
    State(pastes): State<Pastes>,
    mut multipart: Multipart,
) -> crate::ApiResult<impl IntoResponse> {
    let mut content = None;
    let mut title = None;
    let mut expiry = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => title = Some(field.text().await?),
            Some("expiry") => expiry = Some(field.text().await?),
            // the content field, or else the first unnamed or file field
            Some("content") => content = Some(field.text().await?),
            name if content.is_none() => {
                debug!("using multipart field {name:?} as content");
                content = Some(field.text().await?);
            }
            name => debug!("ignoring multipart field {name:?}"),
        }
    }

    let submitted = pastes
        .submit(
            content.as_deref().unwrap_or_default(),
            title.as_deref(),
            expiry.as_deref(),
        )
        .await?;
    Ok(created(submitted, &config))
}

async fn submit_paste(
    State(config): State<Config>,
    State(pastes): State<Pastes>,
    Json(request): Json<SubmitPaste>,
) -> crate::ApiResult<impl IntoResponse> {
    let submitted = pastes
        .submit(
            &request.content,
            request.title.as_deref(),
            request.expiry.as_deref(),
        )
        .await?;
    Ok(created(submitted, &config))
}

fn created(submitted: Submitted, config: &Config) -> impl IntoResponse {
    let path = format!("/{}", submitted.paste.id);
    let base_url = config.base_url.trim_end_matches('/');
    (
        StatusCode::CREATED,
        [(header::LOCATION, path)],
        Json(UploadPaste::new(submitted, base_url)),
    )
}

async fn get_paste_raw(
    State(pastes): State<Pastes>,
    Path(id): Path<String>,
) -> crate::ApiResult<impl IntoResponse> {
    let retrieved = pastes.retrieve(&id, None).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        retrieved.content,
    ))
}

async fn download_paste(
    State(pastes): State<Pastes>,
    Path(id): Path<String>,
) -> crate::ApiResult<impl IntoResponse> {
    let retrieved = pastes.retrieve(&id, None).await?;
    let disposition = format!("attachment; filename=\"{}.txt\"", retrieved.paste.id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        retrieved.content,
    ))
}

async fn get_paste_json(
    State(pastes): State<Pastes>,
    Path(id): Path<String>,
    Query(params): Query<HighlightParams>,
) -> crate::ApiResult<Json<PasteResponse>> {
    let highlight = match (params.lang, params.style) {
        (None, None) => None,
        (language, style) => Some(HighlightRequest {
            language: language.unwrap_or_default(),
            style: style.unwrap_or_default(),
        }),
    };
    let retrieved = pastes.retrieve(&id, highlight).await?;
    Ok(Json(retrieved.into()))
}

async fn get_paste_highlighted(
    State(pastes): State<Pastes>,
    Path((id, lang)): Path<(String, String)>,
) -> crate::ApiResult<Html<String>> {
    highlighted_page(&pastes, &id, lang, String::new()).await
}

async fn get_paste_highlighted_styled(
    State(pastes): State<Pastes>,
    Path((id, lang, style)): Path<(String, String, String)>,
) -> crate::ApiResult<Html<String>> {
    highlighted_page(&pastes, &id, lang, style).await
}

async fn highlighted_page(
    pastes: &Pastes,
    id: &str,
    language: String,
    style: String,
) -> crate::ApiResult<Html<String>> {
    let request = HighlightRequest { language, style };
    let retrieved = pastes.retrieve(id, Some(request)).await?;
    Ok(Html(render_page(&retrieved)))
}

/// Wrap a paste in a minimal HTML page. Highlighter markup is trusted, anything
/// else is escaped here.
fn render_page(retrieved: &Retrieved) -> String {
    let title = escape(&retrieved.paste.raw_title());
    let raw_link = format!("/{}", encode(&retrieved.paste.id));
    let body = if retrieved.highlighted {
        retrieved.content.clone()
    } else {
        format!("<pre>{}</pre>", escape(&retrieved.content))
    };
    let message = retrieved.message.as_deref().map(escape).unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         </head>\n<body>\n<h1>{title}</h1>\n{body}\n<p class=\"message\">{message}</p>\n<p><a \
         href=\"{raw_link}\">raw</a></p>\n</body>\n</html>\n"
    )
}

async fn delete_paste(
    State(pastes): State<Pastes>,
    Query(params): Query<DeleteParams>,
    Path(id): Path<String>,
) -> crate::ApiResult<impl IntoResponse> {
    let delete_key = params.delete_key.ok_or(ApiError::MissingDeleteKey)?;
    pastes.delete(&id, &delete_key).await?;
    Ok(format!("{id} deleted\n"))
}
