//! # Booking Service
//!
//! Request-level operations over the four stores. Handlers call these after
//! decoding the payload and, where required, resolving the session.

use std::sync::Arc;

use crate::bookings::{Booking, BookingRepository, BookingRequest, InMemoryBookingRepository};
use crate::crypto::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::hoods::{Hood, HoodRepository, InMemoryHoodRepository, NewHood};
use crate::session::{
    InMemorySessionRepository, IssuedSession, SessionConfig, SessionManager, SessionRepository,
};
use crate::users::{
    InMemoryUserRepository, LoginRequest, NewUser, RegisterRequest, User, UserRepository,
    UserUpdate,
};

/// The four shared collections behind one handle
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub hoods: Arc<dyn HoodRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Stores {
    /// Process-local stores; state is lost on restart
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            hoods: Arc::new(InMemoryHoodRepository::new()),
            bookings: Arc::new(InMemoryBookingRepository::new()),
            sessions: Arc::new(InMemorySessionRepository::new()),
        }
    }
}

pub struct BookingService {
    users: Arc<dyn UserRepository>,
    hoods: Arc<dyn HoodRepository>,
    bookings: Arc<dyn BookingRepository>,
    sessions: SessionManager,
}

impl BookingService {
    pub fn new(stores: Stores, session_config: SessionConfig) -> Self {
        Self {
            users: stores.users,
            hoods: stores.hoods,
            bookings: stores.bookings,
            sessions: SessionManager::new(session_config, stores.sessions),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        let registration = request.validate()?;

        if self.users.find_by_name(&registration.name).await?.is_some() {
            return Err(AppError::Duplicate(format!(
                "a user named '{}' already exists",
                registration.name
            )));
        }

        let password_hash = hash_password(&registration.password)?;
        let user = self
            .users
            .create(NewUser {
                name: registration.name,
                password_hash,
                email: registration.email,
                emergency_telephone: registration.emergency_telephone,
                research_group: registration.research_group,
            })
            .await?;

        tracing::info!(user_id = user.id, name = %user.name, "user registered");
        Ok(user)
    }

    /// Check credentials and issue a fresh session token
    pub async fn login(&self, request: LoginRequest) -> AppResult<IssuedSession> {
        let user = self
            .users
            .find_by_name(request.login_name())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        let issued = self.sessions.issue(user.id).await?;
        tracing::info!(user_id = user.id, "user logged in");
        Ok(issued)
    }

    /// Revoke the presented session token
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.sessions.revoke(token).await
    }

    /// Resolve a session token to a user id
    pub async fn authenticate(&self, token: &str) -> AppResult<i64> {
        self.sessions.resolve(token).await
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.users.list_all().await
    }

    /// Self-service update of the caller's own record
    pub async fn update_user(
        &self,
        caller_id: i64,
        target_id: i64,
        update: UserUpdate,
    ) -> AppResult<User> {
        if caller_id != target_id {
            return Err(AppError::Permission(
                "user ids do not match".to_string(),
            ));
        }

        let user = self.users.update_with(target_id, update).await?;

        tracing::info!(user_id = user.id, "user updated");
        Ok(user)
    }

    pub async fn list_hoods(&self) -> AppResult<Vec<Hood>> {
        self.hoods.list_all().await
    }

    pub async fn create_hood(&self, request: NewHood) -> AppResult<Hood> {
        let hood = self.hoods.create(request.validate()?).await?;
        tracing::info!(hood_number = hood.hood_number, room = %hood.room, "hood created");
        Ok(hood)
    }

    pub async fn list_bookings(&self) -> AppResult<Vec<Booking>> {
        self.bookings.list_all().await
    }

    /// Book a hood for the caller
    ///
    /// Checks run in order: required fields, hood exists, caller exists and
    /// books for themselves, then the atomic conflict scan and append.
    pub async fn create_booking(&self, caller_id: i64, request: BookingRequest) -> AppResult<Booking> {
        let candidate = request.validate()?;

        if self.hoods.find_by_number(candidate.hood_number).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "hood number {} does not exist",
                candidate.hood_number
            )));
        }

        let caller = self.users.find_by_id(caller_id).await?.ok_or_else(|| {
            AppError::NotFound("user does not exist, consider registration".to_string())
        })?;

        if caller.name != candidate.user_name {
            return Err(AppError::Permission(
                "cannot book a hood for another user".to_string(),
            ));
        }

        let booking = self.bookings.create(candidate).await?;
        tracing::info!(
            booking_id = booking.id,
            user = %booking.user_name,
            hood_number = booking.hood_number,
            booking_time = %booking.booking_time,
            "hood booked"
        );
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::BookingConflict;
    use chrono::{TimeZone, Utc};

    fn create_test_service() -> BookingService {
        BookingService::new(Stores::in_memory(), SessionConfig::default())
    }

    fn registration(name: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some(name.to_string()),
            password: Some(format!("{}-password", name)),
            email: Some(format!("{}@lab.example", name)),
            emergency_telephone: Some("07700900123".to_string()),
            research_group: Some("synthesis".to_string()),
        }
    }

    fn login(name: &str) -> LoginRequest {
        LoginRequest {
            name: name.to_string(),
            password: format!("{}-password", name),
        }
    }

    fn booking(user: &str, hood: i64) -> BookingRequest {
        BookingRequest {
            user_name: Some(user.to_string()),
            hood_number: Some(hood),
            booking_time: Some(Utc.with_ymd_and_hms(2022, 1, 15, 0, 0, 0).unwrap()),
        }
    }

    async fn hood(service: &BookingService, number: i64) {
        service
            .create_hood(NewHood {
                hood_number: Some(number),
                room: Some("AN201".to_string()),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_duplicate_name() {
        let service = create_test_service();

        let first = service.register(registration("dan")).await.unwrap();
        let result = service.register(registration("dan")).await;

        assert!(matches!(result, Err(AppError::Duplicate(_))));
        assert_eq!(service.list_users().await.unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn test_login_and_authenticate() {
        let service = create_test_service();
        let user = service.register(registration("dan")).await.unwrap();

        let issued = service.login(login("dan")).await.unwrap();

        assert_eq!(service.authenticate(&issued.token).await.unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let service = create_test_service();
        service.register(registration("dan")).await.unwrap();

        let wrong_password = service
            .login(LoginRequest {
                name: "dan".to_string(),
                password: "nope".to_string(),
            })
            .await;
        let unknown_user = service.login(login("eve")).await;

        assert!(matches!(wrong_password, Err(AppError::InvalidCredentials)));
        assert!(matches!(unknown_user, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_with_padded_password_and_name() {
        let service = create_test_service();
        let request = RegisterRequest {
            name: Some("dan ".to_string()),
            password: Some("  secret  ".to_string()),
            ..registration("dan")
        };
        service.register(request).await.unwrap();

        let padded = service
            .login(LoginRequest {
                name: "dan ".to_string(),
                password: "  secret  ".to_string(),
            })
            .await;
        assert!(padded.is_ok());

        let exact_name = service
            .login(LoginRequest {
                name: "dan".to_string(),
                password: "  secret  ".to_string(),
            })
            .await;
        assert!(exact_name.is_ok());

        let stripped = service
            .login(LoginRequest {
                name: "dan".to_string(),
                password: "secret".to_string(),
            })
            .await;
        assert!(matches!(stripped, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_relogin_invalidates_old_token() {
        let service = create_test_service();
        service.register(registration("dan")).await.unwrap();

        let old = service.login(login("dan")).await.unwrap();
        let new = service.login(login("dan")).await.unwrap();

        assert!(service.authenticate(&old.token).await.is_err());
        assert!(service.authenticate(&new.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_other_user_denied() {
        let service = create_test_service();
        let dan = service.register(registration("dan")).await.unwrap();
        let eve = service.register(registration("eve")).await.unwrap();

        let result = service
            .update_user(
                dan.id,
                eve.id,
                UserUpdate {
                    email: Some("pwned@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Permission(_))));
        assert_eq!(service.list_users().await.unwrap()[1], eve);
    }

    #[tokio::test]
    async fn test_update_own_record() {
        let service = create_test_service();
        let dan = service.register(registration("dan")).await.unwrap();

        let updated = service
            .update_user(
                dan.id,
                dan.id,
                UserUpdate {
                    research_group: Some("catalysis".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.research_group, "catalysis");
        assert_eq!(updated.password_hash, dan.password_hash);
        assert_eq!(service.list_users().await.unwrap(), vec![updated]);
    }

    #[tokio::test]
    async fn test_update_password_rejected() {
        let service = create_test_service();
        let dan = service.register(registration("dan")).await.unwrap();

        let result = service
            .update_user(
                dan.id,
                dan.id,
                UserUpdate {
                    password: Some("new-secret".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(service.login(login("dan")).await.is_ok());
    }

    #[tokio::test]
    async fn test_booking_scenario() {
        let service = create_test_service();
        let dan = service.register(registration("dan")).await.unwrap();
        let eve = service.register(registration("eve")).await.unwrap();
        hood(&service, 101).await;
        hood(&service, 102).await;

        let booked = service.create_booking(dan.id, booking("dan", 101)).await.unwrap();
        assert_eq!(service.list_bookings().await.unwrap(), vec![booked.clone()]);
        assert_eq!(booked.user_name, "dan");
        assert_eq!(booked.hood_number, 101);

        let same_user = service.create_booking(dan.id, booking("dan", 102)).await;
        assert!(matches!(
            same_user,
            Err(AppError::Conflict(BookingConflict::UserAlreadyBooked { hood_number: 101 }))
        ));

        let same_hood = service.create_booking(eve.id, booking("eve", 101)).await;
        assert!(matches!(
            same_hood,
            Err(AppError::Conflict(BookingConflict::HoodAlreadyBooked { hood_number: 101 }))
        ));

        service.create_booking(eve.id, booking("eve", 102)).await.unwrap();
        assert_eq!(service.list_bookings().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_booking_rejections() {
        let service = create_test_service();
        let dan = service.register(registration("dan")).await.unwrap();
        hood(&service, 101).await;

        let missing_hood = service.create_booking(dan.id, booking("dan", 999)).await;
        assert!(matches!(missing_hood, Err(AppError::NotFound(_))));

        let for_someone_else = service.create_booking(dan.id, booking("eve", 101)).await;
        assert!(matches!(for_someone_else, Err(AppError::Permission(_))));

        let ghost_caller = service.create_booking(42, booking("dan", 101)).await;
        assert!(matches!(ghost_caller, Err(AppError::NotFound(_))));

        let incomplete = service
            .create_booking(
                dan.id,
                BookingRequest {
                    hood_number: Some(101),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(incomplete, Err(AppError::Validation(_))));

        assert!(service.list_bookings().await.unwrap().is_empty());
    }
}
