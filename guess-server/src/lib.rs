pub mod config;
pub mod game_engine;
pub mod players;
pub mod rooms;
pub mod scheduler;
pub mod waiting_pool;
pub mod websocket;

use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Reply};
use warp::hyper::body::Bytes;

use guess_core::SecretSource;
use guess_types::{ErrorBody, ErrorItem, RegisterRequest, RegisterResponse, StatsResponse};

use game_engine::GameEngine;
use players::PlayerStore;
use rooms::RoomStore;
use scheduler::{RoomScheduler, SchedulerConfig};
use waiting_pool::WaitingPool;
use websocket::SessionNotifier;

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Shared handles to every registry, built once and cloned into each
/// connection and background task.
#[derive(Clone)]
pub struct AppState {
    pub players: Arc<PlayerStore>,
    pub pool: Arc<WaitingPool>,
    pub rooms: Arc<RoomStore>,
    pub engine: Arc<GameEngine>,
    pub notifier: Arc<SessionNotifier>,
}

impl AppState {
    pub fn new() -> Self {
        let players = Arc::new(PlayerStore::new());
        let rooms = Arc::new(RoomStore::new());
        Self {
            pool: Arc::new(WaitingPool::new(players.clone())),
            engine: Arc::new(GameEngine::new(players.clone(), rooms.clone())),
            notifier: Arc::new(SessionNotifier::new()),
            players,
            rooms,
        }
    }

    pub fn scheduler(&self, config: SchedulerConfig) -> RoomScheduler {
        RoomScheduler::new(
            config,
            self.pool.clone(),
            self.rooms.clone(),
            self.players.clone(),
            self.notifier.clone(),
        )
    }

    pub fn scheduler_with_secrets(
        &self,
        config: SchedulerConfig,
        secrets: Arc<dyn SecretSource>,
    ) -> RoomScheduler {
        RoomScheduler::with_secret_source(
            config,
            self.pool.clone(),
            self.rooms.clone(),
            self.players.clone(),
            self.notifier.clone(),
            secrets,
        )
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    let websocket = warp::path("websocket")
        .and(warp::path::end())
        .and(warp::ws())
        .and(state_filter.clone())
        .map(|ws: warp::ws::Ws, state: AppState| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, state))
        });

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let register = warp::path("register")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(state_filter.clone())
        .and_then(handle_register)
        .recover(recover_register_body)
        .unify();

    let stats = warp::path("stats")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(handle_stats);

    let room_results = warp::path!("rooms" / String / "results")
        .and(warp::get())
        .and(state_filter)
        .and_then(handle_room_results);

    websocket
        .or(health)
        .or(register)
        .or(stats)
        .or(room_results)
        .with(warp::log("guess_rooms"))
}

fn error_reply(
    item: ErrorItem,
    message: impl Into<String>,
    status: StatusCode,
) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody::new(item, message)), status)
        .into_response()
}

async fn handle_register(
    body: Bytes,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    let request: RegisterRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return Ok(error_reply(
                ErrorItem::InvalidParams,
                format!("invalid register body: {}", e),
                StatusCode::BAD_REQUEST,
            ));
        }
    };

    if request.nickname.trim().is_empty() {
        return Ok(error_reply(
            ErrorItem::InvalidParams,
            "nickname must not be blank",
            StatusCode::BAD_REQUEST,
        ));
    }

    let id = state.players.register(&request.nickname).await;
    Ok(warp::reply::with_status(
        warp::reply::json(&RegisterResponse { id: id.to_string() }),
        StatusCode::CREATED,
    )
    .into_response())
}

async fn recover_register_body(
    rejection: warp::Rejection,
) -> Result<warp::reply::Response, warp::Rejection> {
    let message = if rejection.find::<warp::reject::LengthRequired>().is_some() {
        "register body is required".to_string()
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        format!("register body exceeds {} bytes", MAX_BODY_BYTES)
    } else {
        return Err(rejection);
    };
    Ok(error_reply(
        ErrorItem::InvalidParams,
        message,
        StatusCode::BAD_REQUEST,
    ))
}

async fn handle_stats(state: AppState) -> Result<warp::reply::Response, warp::Rejection> {
    let response = StatsResponse {
        registered_players: state.players.count().await,
        active_rooms: state.rooms.list_summaries().await,
    };
    Ok(warp::reply::json(&response).into_response())
}

async fn handle_room_results(
    room_id: String,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    let room = match state.rooms.resolve(&room_id).await {
        Ok(entry) => entry.id,
        Err(e) => {
            return Ok(error_reply(e.item(), e.to_string(), StatusCode::NOT_FOUND));
        }
    };

    match state.engine.current_results(room).await {
        Ok(results) => Ok(warp::reply::json(&results).into_response()),
        // Evicted between lookup and read
        Err(e) => Ok(error_reply(e.item(), e.to_string(), StatusCode::NOT_FOUND)),
    }
}
