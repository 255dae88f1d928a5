//! # Dispatch Table
//!
//! Every route the service answers is one `Endpoint`. The table decides the
//! method, the path, the handler and whether the session gate runs first.

use axum::{
    http::Method,
    middleware,
    routing::{get, post, put, MethodRouter},
    Router,
};

use super::auth::session_gate;
use super::handlers;
use super::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    Register,
    Login,
    Logout,
    ListUsers,
    UpdateUser,
    ListHoods,
    CreateHood,
    ListBookings,
    CreateBooking,
}

impl Endpoint {
    pub const ALL: [Endpoint; 10] = [
        Endpoint::Health,
        Endpoint::Register,
        Endpoint::Login,
        Endpoint::Logout,
        Endpoint::ListUsers,
        Endpoint::UpdateUser,
        Endpoint::ListHoods,
        Endpoint::CreateHood,
        Endpoint::ListBookings,
        Endpoint::CreateBooking,
    ];

    pub fn method(self) -> Method {
        match self {
            Endpoint::Health
            | Endpoint::ListUsers
            | Endpoint::ListHoods
            | Endpoint::ListBookings => Method::GET,
            Endpoint::Register
            | Endpoint::Login
            | Endpoint::Logout
            | Endpoint::CreateHood
            | Endpoint::CreateBooking => Method::POST,
            Endpoint::UpdateUser => Method::PUT,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Health => "/health",
            Endpoint::Register => "/register",
            Endpoint::Login => "/login",
            Endpoint::Logout => "/logout",
            Endpoint::ListUsers => "/user",
            Endpoint::UpdateUser => "/user/:id",
            Endpoint::ListHoods | Endpoint::CreateHood => "/hood",
            Endpoint::ListBookings | Endpoint::CreateBooking => "/booking",
        }
    }

    /// Whether a live session must be presented
    pub fn requires_session(self) -> bool {
        !matches!(
            self,
            Endpoint::Health | Endpoint::Register | Endpoint::Login
        )
    }

    fn handler(self) -> MethodRouter<AppState> {
        match self {
            Endpoint::Health => get(handlers::health),
            Endpoint::Register => post(handlers::register),
            Endpoint::Login => post(handlers::login),
            Endpoint::Logout => post(handlers::logout),
            Endpoint::ListUsers => get(handlers::list_users),
            Endpoint::UpdateUser => put(handlers::update_user),
            Endpoint::ListHoods => get(handlers::list_hoods),
            Endpoint::CreateHood => post(handlers::create_hood),
            Endpoint::ListBookings => get(handlers::list_bookings),
            Endpoint::CreateBooking => post(handlers::create_booking),
        }
    }

    /// Handler for this endpoint, behind the session gate when required
    pub fn method_router(self, state: &AppState) -> MethodRouter<AppState> {
        let handler = self.handler();
        if self.requires_session() {
            handler.route_layer(middleware::from_fn_with_state(state.clone(), session_gate))
        } else {
            handler
        }
    }
}

/// Router holding every endpoint in the table, without outer layers
pub fn api_routes(state: AppState) -> Router {
    let router = Endpoint::ALL
        .iter()
        .fold(Router::new(), |router, endpoint| {
            router.route(endpoint.path(), endpoint.method_router(&state))
        });

    router.with_state(state)
}
