//! Client core for the pet adoption service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The host executes the actual
//! HTTP round trip, which keeps the core deterministic and testable.
//!
//! # Design
//! - `AdoptaClient` holds only configuration and the session. Every endpoint
//!   is split into `build_*` and `parse_*`.
//! - Backend records drift between schemas (`nombre_mascota` vs `nombre`,
//!   `sexo` vs `genero`); a private adapter layer maps them onto one model.
//! - `ListingScreen` owns the state of one listing: last snapshot, filters,
//!   refresh policy and per-action submission guards. It never blocks; it
//!   hands out requests and is told their results.

mod adapter;
pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod filter;
pub mod http;
pub mod images;
pub mod refresh;
pub mod screen;
pub mod session;
pub mod store;
pub mod types;
pub mod validation;

pub use client::AdoptaClient;
pub use config::ClientConfig;
pub use error::{ApiError, ValidationErrors};
pub use filter::{FilterCriteria, ListingProfile, StatusFilter};
pub use http::{FilePart, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
pub use refresh::{MutationKey, MutationKind, ScreenEvent};
pub use screen::{ListingScreen, PendingFetch, PendingMutation};
pub use session::Session;
pub use store::{FetchOutcome, LoadState, Notification, NotificationKind};
pub use types::{
    AdoptionAction, AdoptionRequest, AdoptionStage, Credentials, GuestRegistration,
    PasswordChange, PasswordReset, Pet, PetForm, PetImage, PetStatus, ProfileUpdate,
    RegisterUser, ResetRequested, Role, User, Vaccine, VaccineForm, VaccineStatus,
};
