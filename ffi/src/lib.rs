//! C-ABI wrapper around `adopta-core`.
//!
//! # Overview
//! Exposes sign-in, the pet listing, the adoption mutations and the
//! listing-screen state machine through `extern "C"` functions, so a
//! mobile host can drive the core without linking serde or an HTTP stack.
//! The host still performs every round trip itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `adopta_build_*` / `adopta_parse_*` mirror the core client 1:1.
//! - A single `FfiAdoptaResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - Screens are opaque handles. Fetch and mutation tickets stay inside the
//!   handle; C only sees numeric ticket ids.
//! - The C caller owns all returned pointers and must call the matching
//!   `adopta_*_free` / `adopta_free_*` function to release them.

pub mod types;

use std::os::raw::c_char;
use std::panic::catch_unwind;

use adopta_core::screen::ListingScreen;
use adopta_core::{AdoptaClient, AdoptionAction, ApiError, ClientConfig, Credentials, HttpResponse, Session};

use types::*;

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a guest `AdoptaClient` bound to `base_url`.
///
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `adopta_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_client_new(base_url: *const c_char) -> *mut FfiAdoptaClient {
    catch_unwind(|| {
        let Some(url) = read_c_str(base_url) else {
            return std::ptr::null_mut();
        };
        let client = AdoptaClient::new(ClientConfig::new(url), Session::Guest);
        Box::into_raw(Box::new(FfiAdoptaClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `adopta_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_client_free(client: *mut FfiAdoptaClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

/// Whether the client holds a signed-in session.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_client_is_authenticated(client: *const FfiAdoptaClient) -> bool {
    catch_unwind(|| {
        if client.is_null() {
            return false;
        }
        let client = unsafe { &*client };
        client.inner.session().token().is_some()
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build the login request.
///
/// Returns null if any argument is null or the credentials fail validation.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_build_login(
    client: *const FfiAdoptaClient,
    email: *const c_char,
    password: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(email), Some(password)) = (read_c_str(email), read_c_str(password)) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        match client.inner.build_login(&credentials) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build an HTTP request for listing all pets.
///
/// Returns null if `client` is null.
/// The caller must free the returned pointer with `adopta_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_build_list_pets(client: *const FfiAdoptaClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_list_pets())
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn adopta_build_delete_pet(
    client: *const FfiAdoptaClient,
    pet_id: u64,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_delete_pet(pet_id))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the request that starts an adoption for the signed-in user.
///
/// Returns null for a guest client.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_build_start_adoption(
    client: *const FfiAdoptaClient,
    pet_id: u64,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match client.inner.build_start_adoption(pet_id) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the request that accepts (`accept == true`) or denies an adoption.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_build_administer_adoption(
    client: *const FfiAdoptaClient,
    adoption_id: u64,
    accept: bool,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match client.inner.build_administer_adoption(adoption_id, action(accept)) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

fn action(accept: bool) -> AdoptionAction {
    if accept {
        AdoptionAction::Accept
    } else {
        AdoptionAction::Deny
    }
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Parse a login response and install the session on `client`.
///
/// On success the result carries no data; later requests built from this
/// client (and screens created from it) are authenticated.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_parse_login(
    client: *mut FfiAdoptaClient,
    response: *const FfiHttpResponse,
) -> *mut FfiAdoptaResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiAdoptaResult::null_arg("client");
        }
        if response.is_null() {
            return FfiAdoptaResult::null_arg("response");
        }
        let client = unsafe { &mut *client };
        let resp = unsafe { &*response }.to_core();
        match client.inner.parse_login(resp) {
            Ok(session) => {
                client.inner.set_session(session);
                FfiAdoptaResult::ok_empty()
            }
            Err(e) => FfiAdoptaResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiAdoptaResult::panic("panic in adopta_parse_login"))
}

/// Parse a pet listing response.
///
/// Returns an `FfiAdoptaResult` with `data_tag = PetList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_parse_list_pets(
    client: *const FfiAdoptaClient,
    response: *const FfiHttpResponse,
) -> *mut FfiAdoptaResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiAdoptaResult::null_arg("client");
        }
        if response.is_null() {
            return FfiAdoptaResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response }.to_core();
        match client.inner.parse_list_pets(resp) {
            Ok(pets) => FfiAdoptaResult::ok_pets(&pets),
            Err(e) => FfiAdoptaResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiAdoptaResult::panic("panic in adopta_parse_list_pets"))
}

/// Parse the response of any mutation (delete, adoption start/accept/deny).
///
/// Returns `data_tag = Mutation`; the message is null when the backend
/// did not send one.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_parse_mutation(
    client: *const FfiAdoptaClient,
    response: *const FfiHttpResponse,
) -> *mut FfiAdoptaResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiAdoptaResult::null_arg("client");
        }
        if response.is_null() {
            return FfiAdoptaResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response }.to_core();
        match client.inner.parse_mutation(resp) {
            Ok(outcome) => FfiAdoptaResult::ok_mutation(outcome.message.as_deref()),
            Err(e) => FfiAdoptaResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiAdoptaResult::panic("panic in adopta_parse_mutation"))
}

// ---------------------------------------------------------------------------
// Listing screens
// ---------------------------------------------------------------------------

/// Create a listing screen of `kind` with a copy of `client`'s session.
///
/// Returns null if `client` is null, or for adoption listings when the
/// client is not signed in.
/// The caller must free the returned pointer with `adopta_screen_free`.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_new(
    client: *const FfiAdoptaClient,
    kind: FfiScreenKind,
) -> *mut FfiListingScreen {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client }.inner.clone();
        let inner = match kind {
            FfiScreenKind::PublicPets => Ok(ScreenInner::Pets(ListingScreen::public_pets(client))),
            FfiScreenKind::AdminPets => Ok(ScreenInner::Pets(ListingScreen::admin_pets(client))),
            FfiScreenKind::PendingAdoptions => {
                ListingScreen::pending_adoptions(client).map(ScreenInner::Adoptions)
            }
            FfiScreenKind::AcceptedAdoptions => {
                ListingScreen::accepted_adoptions(client).map(ScreenInner::Adoptions)
            }
        };
        match inner {
            Ok(inner) => Box::into_raw(Box::new(FfiListingScreen::new(inner))),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_free(screen: *mut FfiListingScreen) {
    if !screen.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(screen) });
        });
    }
}

/// Forward a lifecycle event.
///
/// Returns the fetch the host must execute, or null when none is due.
/// Pass the ticket back to `adopta_screen_receive` with the response.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_handle_event(
    screen: *mut FfiListingScreen,
    event: FfiScreenEvent,
) -> *mut FfiPendingRequest {
    catch_unwind(|| {
        if screen.is_null() {
            return std::ptr::null_mut();
        }
        let screen = unsafe { &mut *screen };
        let fetch = match &mut screen.inner {
            ScreenInner::Pets(s) => s.handle(event.into()),
            ScreenInner::Adoptions(s) => s.handle(event.into()),
        };
        match fetch {
            Some(fetch) => screen.track_fetch(fetch),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Report the response of a fetch.
///
/// A null `response` reports a transport failure, described by
/// `transport_error` (which may also be null).
#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_receive(
    screen: *mut FfiListingScreen,
    ticket: u64,
    response: *const FfiHttpResponse,
    transport_error: *const c_char,
) -> FfiFetchOutcome {
    catch_unwind(|| {
        if screen.is_null() {
            return FfiFetchOutcome::NullArg;
        }
        let screen = unsafe { &mut *screen };
        let Some(ticket) = screen.fetches.remove(&ticket) else {
            return FfiFetchOutcome::UnknownTicket;
        };
        let result = response_result(response, transport_error);
        let outcome = match &mut screen.inner {
            ScreenInner::Pets(s) => s.receive(ticket, result),
            ScreenInner::Adoptions(s) => s.receive(ticket, result),
        };
        outcome.into()
    })
    .unwrap_or(FfiFetchOutcome::Panic)
}

fn response_result(
    response: *const FfiHttpResponse,
    transport_error: *const c_char,
) -> Result<HttpResponse, ApiError> {
    if response.is_null() {
        let reason = read_c_str(transport_error).unwrap_or("request failed");
        return Err(ApiError::Transport(reason.to_string()));
    }
    Ok(unsafe { &*response }.to_core())
}

#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_state(screen: *const FfiListingScreen) -> FfiLoadState {
    catch_unwind(|| {
        if screen.is_null() {
            return FfiLoadState::Error;
        }
        match &unsafe { &*screen }.inner {
            ScreenInner::Pets(s) => s.state().into(),
            ScreenInner::Adoptions(s) => s.state().into(),
        }
    })
    .unwrap_or(FfiLoadState::Error)
}

/// Set the free-text search. Null clears it.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_set_query(screen: *mut FfiListingScreen, query: *const c_char) {
    if screen.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let screen = unsafe { &mut *screen };
        let query = read_c_str(query).unwrap_or_default();
        match &mut screen.inner {
            ScreenInner::Pets(s) => s.set_query(query),
            ScreenInner::Adoptions(s) => s.set_query(query),
        }
    });
}

/// Set the status filter by key. Null or `"Todos"` shows every status.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_set_status(screen: *mut FfiListingScreen, status: *const c_char) {
    if screen.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let screen = unsafe { &mut *screen };
        let status = read_c_str(status).unwrap_or_default();
        match &mut screen.inner {
            ScreenInner::Pets(s) => s.set_status(status),
            ScreenInner::Adoptions(s) => s.set_status(status),
        }
    });
}

/// The pets currently visible after filtering.
///
/// For adoption listings these are the pets of the visible requests.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_visible_pets(screen: *const FfiListingScreen) -> *mut FfiAdoptaResult {
    catch_unwind(|| {
        if screen.is_null() {
            return FfiAdoptaResult::null_arg("screen");
        }
        match &unsafe { &*screen }.inner {
            ScreenInner::Pets(s) => FfiAdoptaResult::ok_pets(s.visible()),
            ScreenInner::Adoptions(s) => {
                FfiAdoptaResult::ok_pets(s.visible().into_iter().map(|a| &a.pet))
            }
        }
    })
    .unwrap_or_else(|_| FfiAdoptaResult::panic("panic in adopta_screen_visible_pets"))
}

/// Pop the oldest pending notification, or null when there is none.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_take_notification(
    screen: *mut FfiListingScreen,
) -> *mut FfiNotification {
    catch_unwind(|| {
        if screen.is_null() {
            return std::ptr::null_mut();
        }
        let screen = unsafe { &mut *screen };
        let notification = match &mut screen.inner {
            ScreenInner::Pets(s) => s.take_notification(),
            ScreenInner::Adoptions(s) => s.take_notification(),
        };
        notification.map_or(std::ptr::null_mut(), FfiNotification::from_core)
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Screen mutations
// ---------------------------------------------------------------------------

/// Start deleting a pet from this screen.
///
/// Returns null when the same deletion is already submitting or the
/// request cannot be built; check `adopta_screen_take_notification` for
/// the reason. Report the response with `adopta_screen_finish_mutation`.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_delete_pet(
    screen: *mut FfiListingScreen,
    pet_id: u64,
) -> *mut FfiPendingRequest {
    catch_unwind(|| {
        if screen.is_null() {
            return std::ptr::null_mut();
        }
        let screen = unsafe { &mut *screen };
        let pending = match &mut screen.inner {
            ScreenInner::Pets(s) => s.delete_pet(pet_id),
            ScreenInner::Adoptions(s) => s.delete_pet(pet_id),
        };
        match pending {
            Ok(pending) => screen.track_mutation(pending),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_start_adoption(
    screen: *mut FfiListingScreen,
    pet_id: u64,
) -> *mut FfiPendingRequest {
    catch_unwind(|| {
        if screen.is_null() {
            return std::ptr::null_mut();
        }
        let screen = unsafe { &mut *screen };
        let pending = match &mut screen.inner {
            ScreenInner::Pets(s) => s.start_adoption(pet_id),
            ScreenInner::Adoptions(s) => s.start_adoption(pet_id),
        };
        match pending {
            Ok(pending) => screen.track_mutation(pending),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_administer_adoption(
    screen: *mut FfiListingScreen,
    adoption_id: u64,
    accept: bool,
) -> *mut FfiPendingRequest {
    catch_unwind(|| {
        if screen.is_null() {
            return std::ptr::null_mut();
        }
        let screen = unsafe { &mut *screen };
        let pending = match &mut screen.inner {
            ScreenInner::Pets(s) => s.administer_adoption(adoption_id, action(accept)),
            ScreenInner::Adoptions(s) => s.administer_adoption(adoption_id, action(accept)),
        };
        match pending {
            Ok(pending) => screen.track_mutation(pending),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Report the response of a mutation.
///
/// Queues one notification and returns the refetch that reconciles the
/// listing (null when the screen is no longer active or the ticket is
/// unknown). A null `response` reports a transport failure.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_screen_finish_mutation(
    screen: *mut FfiListingScreen,
    ticket: u64,
    response: *const FfiHttpResponse,
    transport_error: *const c_char,
) -> *mut FfiPendingRequest {
    catch_unwind(|| {
        if screen.is_null() {
            return std::ptr::null_mut();
        }
        let screen = unsafe { &mut *screen };
        let Some(ticket) = screen.mutations.remove(&ticket) else {
            return std::ptr::null_mut();
        };
        let result = response_result(response, transport_error);
        let refetch = match &mut screen.inner {
            ScreenInner::Pets(s) => s.finish_mutation(ticket, result),
            ScreenInner::Adoptions(s) => s.finish_mutation(ticket, result),
        };
        match refetch {
            Some(fetch) => screen.track_fetch(fetch),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by an `adopta_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_free_request(req: *mut FfiHttpRequest) {
    let _ = catch_unwind(|| FfiHttpRequest::free(req));
}

/// Free an `FfiAdoptaResult` and its payload. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_free_result(result: *mut FfiAdoptaResult) {
    let _ = catch_unwind(|| FfiAdoptaResult::free(result));
}

/// Free a pending fetch or mutation, including its request.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn adopta_free_pending(pending: *mut FfiPendingRequest) {
    let _ = catch_unwind(|| FfiPendingRequest::free(pending));
}

#[unsafe(no_mangle)]
pub extern "C" fn adopta_free_notification(notification: *mut FfiNotification) {
    let _ = catch_unwind(|| FfiNotification::free(notification));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
