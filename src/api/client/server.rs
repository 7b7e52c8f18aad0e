//! `actix-web` server: static files, the ICE endpoint, and the WebSocket
//! signaling upgrade. Grounded on `mock/control-api/src/api/mod.rs::run`
//! and `mock/control-api/src/api/ws.rs::create_ws`, generalized from a
//! Control API REST mock into the client-facing signaling surface.

use std::sync::Arc;

use actix_files::Files;
use actix_web::{
    middleware,
    web::{self, Data, Path, Payload, Query},
    App, HttpRequest, HttpResponse, HttpServer,
};
use actix_web_actors::ws;
use serde::Deserialize;
use slog_scope::{error, info};

use crate::{
    auth,
    conf::Conf,
    error::AviaryError,
    ice::IceCredentialProvider,
    signalling::{PeerSession, RoomsRepository},
};

/// Shared application state, handed to every request handler via
/// `actix_web::web::Data`.
pub struct AppContext {
    pub conf: Conf,
    pub rooms: RoomsRepository,
    pub ice_provider: Arc<dyn IceCredentialProvider>,
}

#[derive(Deserialize)]
struct WsQuery {
    #[serde(default)]
    token: String,
}

/// `GET /ice`: hands the caller a fresh set of ICE server descriptors.
async fn get_ice_servers(state: Data<AppContext>) -> HttpResponse {
    match state.ice_provider.fetch().await {
        Ok(servers) => HttpResponse::Ok().json(servers),
        Err(e) => {
            error!("ICE credential fetch failed"; "error" => %e);
            HttpResponse::BadGateway().finish()
        }
    }
}

/// `GET /ws/{room_id}?token=...`: upgrades to a WebSocket and hands the
/// connection to a fresh [`PeerSession`].
async fn ws_connect(
    request: HttpRequest,
    room_id: Path<String>,
    query: Query<WsQuery>,
    state: Data<AppContext>,
    payload: Payload,
) -> Result<HttpResponse, actix_web::Error> {
    let secret = state.conf.auth.secret.as_bytes();
    let role = auth::role_of(&query.token, secret);
    let room = state.rooms.get_or_create(&room_id.into_inner());

    let session = PeerSession::new(
        role,
        room,
        Arc::clone(&state.ice_provider),
        state.conf.server.ping_interval,
        state.conf.server.idle_timeout,
    );

    ws::start(session, &request, payload)
}

/// Builds and runs the HTTP server until it's shut down.
///
/// # Errors
///
/// Errors if the configured address is already in use, or on any other
/// failure to bind the listening socket.
pub async fn run(
    conf: Conf,
    ice_provider: Arc<dyn IceCredentialProvider>,
) -> Result<(), AviaryError> {
    let bind_addr = conf.server.bind_addr();
    let static_dir = conf.server.static_files_dir.clone();

    info!("starting aviary"; "bind_addr" => %bind_addr);

    let ctx = Data::new(AppContext {
        conf,
        rooms: RoomsRepository::new(),
        ice_provider,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(ctx.clone())
            .wrap(middleware::Logger::default())
            .service(web::resource("/ice").route(web::get().to(get_ice_servers)))
            .service(
                web::resource("/ws/{room_id}").route(web::get().to(ws_connect)),
            )
            .service(Files::new("/", &static_dir).index_file("index.html"))
    })
    .bind(&bind_addr)
    .map_err(|e| AviaryError::Bind(bind_addr.clone(), e))?
    .run()
    .await
    .map_err(|e| AviaryError::Bind(bind_addr, e))
}
