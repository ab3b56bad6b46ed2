//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers plus lengths instead of
//! `Vec`, and tagged enums with explicit discriminants. Request bodies are
//! `(u8*, len)` because multipart payloads carry binary image data.
//! Conversion functions live here to keep `lib.rs` focused on the
//! `extern "C"` surface.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use adopta_core::error::ApiError;
use adopta_core::http::HttpMethod;
use adopta_core::refresh::MutationTicket;
use adopta_core::screen::{AllPets, ListingScreen, PendingFetch, PendingMutation, UserAdoptions};
use adopta_core::store::{FetchOutcome, FetchTicket, LoadState, Notification, NotificationKind};
use adopta_core::{HttpResponse, Pet};

/// Opaque handle to an `AdoptaClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiAdoptaClient {
    pub(crate) inner: adopta_core::AdoptaClient,
}

/// Copy `s` into a heap C string. Interior NUL bytes are dropped.
pub(crate) fn c_string(s: &str) -> *mut c_char {
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

pub(crate) fn opt_c_string(s: Option<&str>) -> *mut c_char {
    s.map_or(std::ptr::null_mut(), c_string)
}

/// Borrow a caller-provided C string. Null and invalid UTF-8 read as `None`.
pub(crate) fn read_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

pub(crate) fn free_c_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// Leak a vector as a boxed slice; null when empty.
fn into_raw_slice<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    let ptr = Box::into_raw(items.into_boxed_slice()) as *mut T;
    (ptr, len)
}

/// Reclaim a slice leaked by `into_raw_slice`.
///
/// # Safety
/// `ptr`/`len` must come from `into_raw_slice` and not be freed twice.
unsafe fn from_raw_slice<T>(ptr: *mut T, len: u32) -> Option<Box<[T]>> {
    if ptr.is_null() || len == 0 {
        return None;
    }
    let slice = std::ptr::slice_from_raw_parts_mut(ptr, len as usize);
    Some(unsafe { Box::from_raw(slice) })
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// `headers` already contains `content-type` when there is a body. `body`
/// is null for bodiless requests.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub path: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut u8,
    pub body_len: u32,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: adopta_core::HttpRequest) -> *mut Self {
        let body = req.body_bytes().unwrap_or_default();
        let (body, body_len) = into_raw_slice(body);
        let headers: Vec<FfiHeader> = req
            .headers
            .iter()
            .map(|(k, v)| FfiHeader {
                key: c_string(k),
                value: c_string(v),
            })
            .collect();
        let (headers, headers_len) = into_raw_slice(headers);

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            path: c_string(&req.path),
            headers,
            headers_len,
            body,
            body_len,
        }))
    }

    /// Release everything owned by a request returned from `from_core`.
    pub(crate) fn free(req: *mut Self) {
        if req.is_null() {
            return;
        }
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.path);
        drop(unsafe { from_raw_slice(req.body, req.body_len) });
        if let Some(headers) = unsafe { from_raw_slice(req.headers, req.headers_len) } {
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing a request and
/// passes a pointer to an `adopta_parse_*` or `adopta_screen_*` function.
/// The FFI layer reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

impl FfiHttpResponse {
    pub(crate) fn to_core(&self) -> HttpResponse {
        HttpResponse::new(self.status, read_c_str(self.body).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiAdoptaResult`.
#[repr(C)]
pub enum FfiErrorCode {
    Ok = 0,
    NotFound = 1,
    Http = 2,
    Transport = 3,
    Deserialization = 4,
    Serialization = 5,
    Validation = 6,
    Busy = 7,
    Unauthenticated = 8,
    Panic = 9,
    NullArg = 10,
}

/// Tag that tells `adopta_free_result` what `FfiAdoptaResult::data` points to.
#[repr(C)]
pub enum FfiDataTag {
    None = 0,
    PetList = 1,
    Mutation = 2,
}

/// A pet exposed to C. `main_image` is null when the pet has no images;
/// `images` is the comma-joined gallery.
#[repr(C)]
pub struct FfiPet {
    pub id: u64,
    pub name: *mut c_char,
    pub breed: *mut c_char,
    pub category: *mut c_char,
    pub sex: *mut c_char,
    pub status: *mut c_char,
    pub description: *mut c_char,
    pub main_image: *mut c_char,
    pub images: *mut c_char,
}

impl FfiPet {
    fn from_core(pet: &Pet) -> Self {
        FfiPet {
            id: pet.id,
            name: c_string(&pet.name),
            breed: c_string(&pet.breed),
            category: c_string(&pet.category),
            sex: c_string(&pet.sex),
            status: c_string(pet.status.as_str()),
            description: c_string(&pet.description),
            main_image: opt_c_string(pet.main_image()),
            images: c_string(&adopta_core::images::join_images(&pet.images)),
        }
    }

    fn free_fields(&self) {
        for ptr in [
            self.name,
            self.breed,
            self.category,
            self.sex,
            self.status,
            self.description,
            self.main_image,
            self.images,
        ] {
            free_c_string(ptr);
        }
    }
}

#[repr(C)]
pub struct FfiPetList {
    pub items: *mut FfiPet,
    pub len: u32,
}

/// Outcome of a mutation; `message` is null when the backend sent none.
#[repr(C)]
pub struct FfiMutation {
    pub message: *mut c_char,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the parsed payload (tagged by `data_tag`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, and `data` is null.
#[repr(C)]
pub struct FfiAdoptaResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut std::ffi::c_void,
}

impl FfiAdoptaResult {
    fn ok(data_tag: FfiDataTag, data: *mut std::ffi::c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiAdoptaResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    pub(crate) fn ok_pets<'a>(pets: impl IntoIterator<Item = &'a Pet>) -> *mut Self {
        let items: Vec<FfiPet> = pets.into_iter().map(FfiPet::from_core).collect();
        let (items, len) = into_raw_slice(items);
        let list = Box::new(FfiPetList { items, len });
        Self::ok(FfiDataTag::PetList, Box::into_raw(list) as *mut std::ffi::c_void)
    }

    pub(crate) fn ok_mutation(message: Option<&str>) -> *mut Self {
        let mutation = Box::new(FfiMutation {
            message: opt_c_string(message),
        });
        Self::ok(FfiDataTag::Mutation, Box::into_raw(mutation) as *mut std::ffi::c_void)
    }

    /// Success with no payload (e.g. login, which installs the session).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::ok(FfiDataTag::None, std::ptr::null_mut())
    }

    fn error(error_code: FfiErrorCode, http_status: u16, message: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiAdoptaResult {
            error_code,
            error_message: c_string(message),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let (code, status) = match &err {
            ApiError::NotFound => (FfiErrorCode::NotFound, 404),
            ApiError::Server { status, .. } => (FfiErrorCode::Http, *status),
            ApiError::Transport(_) => (FfiErrorCode::Transport, 0),
            ApiError::Deserialization(_) => (FfiErrorCode::Deserialization, 0),
            ApiError::Serialization(_) => (FfiErrorCode::Serialization, 0),
            ApiError::Validation(_) => (FfiErrorCode::Validation, 0),
            ApiError::Busy(_) => (FfiErrorCode::Busy, 0),
            ApiError::Unauthenticated => (FfiErrorCode::Unauthenticated, 0),
        };
        Self::error(code, status, &err.to_string())
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, 0, &format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, 0, msg)
    }

    pub(crate) fn free(result: *mut Self) {
        if result.is_null() {
            return;
        }
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::PetList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiPetList) };
                if let Some(items) = unsafe { from_raw_slice(list.items, list.len) } {
                    items.iter().for_each(FfiPet::free_fields);
                }
            }
            FfiDataTag::Mutation => {
                let mutation = unsafe { Box::from_raw(result.data as *mut FfiMutation) };
                free_c_string(mutation.message);
            }
            FfiDataTag::None => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Listing screens
// ---------------------------------------------------------------------------

/// Which listing a screen handle shows.
#[repr(C)]
#[derive(Clone, Copy)]
pub enum FfiScreenKind {
    PublicPets = 0,
    AdminPets = 1,
    PendingAdoptions = 2,
    AcceptedAdoptions = 3,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub enum FfiScreenEvent {
    Mounted = 0,
    Focused = 1,
    Blurred = 2,
    Unmounted = 3,
}

impl From<FfiScreenEvent> for adopta_core::ScreenEvent {
    fn from(e: FfiScreenEvent) -> Self {
        match e {
            FfiScreenEvent::Mounted => adopta_core::ScreenEvent::Mounted,
            FfiScreenEvent::Focused => adopta_core::ScreenEvent::Focused,
            FfiScreenEvent::Blurred => adopta_core::ScreenEvent::Blurred,
            FfiScreenEvent::Unmounted => adopta_core::ScreenEvent::Unmounted,
        }
    }
}

#[repr(C)]
pub enum FfiLoadState {
    Loading = 0,
    Ready = 1,
    Error = 2,
}

impl From<LoadState> for FfiLoadState {
    fn from(s: LoadState) -> Self {
        match s {
            LoadState::Loading => FfiLoadState::Loading,
            LoadState::Ready => FfiLoadState::Ready,
            LoadState::Error => FfiLoadState::Error,
        }
    }
}

#[repr(C)]
pub enum FfiFetchOutcome {
    Applied = 0,
    Failed = 1,
    Discarded = 2,
    /// The ticket was never issued by this screen, or already used.
    UnknownTicket = 3,
    NullArg = 4,
    Panic = 5,
}

impl From<FetchOutcome> for FfiFetchOutcome {
    fn from(o: FetchOutcome) -> Self {
        match o {
            FetchOutcome::Applied { .. } => FfiFetchOutcome::Applied,
            FetchOutcome::Failed => FfiFetchOutcome::Failed,
            FetchOutcome::Discarded => FfiFetchOutcome::Discarded,
        }
    }
}

/// A request the host must execute, identified by `ticket`.
#[repr(C)]
pub struct FfiPendingRequest {
    pub ticket: u64,
    pub request: *mut FfiHttpRequest,
}

impl FfiPendingRequest {
    pub(crate) fn new(ticket: u64, req: adopta_core::HttpRequest) -> *mut Self {
        Box::into_raw(Box::new(FfiPendingRequest {
            ticket,
            request: FfiHttpRequest::from_core(req),
        }))
    }

    pub(crate) fn free(pending: *mut Self) {
        if pending.is_null() {
            return;
        }
        let pending = unsafe { Box::from_raw(pending) };
        FfiHttpRequest::free(pending.request);
    }
}

#[repr(C)]
pub enum FfiNotificationKind {
    Success = 0,
    Error = 1,
}

#[repr(C)]
pub struct FfiNotification {
    pub kind: FfiNotificationKind,
    pub message: *mut c_char,
}

impl FfiNotification {
    pub(crate) fn from_core(n: Notification) -> *mut Self {
        let kind = match n.kind {
            NotificationKind::Success => FfiNotificationKind::Success,
            NotificationKind::Error => FfiNotificationKind::Error,
        };
        Box::into_raw(Box::new(FfiNotification {
            kind,
            message: c_string(&n.message),
        }))
    }

    pub(crate) fn free(n: *mut Self) {
        if n.is_null() {
            return;
        }
        let n = unsafe { Box::from_raw(n) };
        free_c_string(n.message);
    }
}

pub(crate) enum ScreenInner {
    Pets(ListingScreen<AllPets>),
    Adoptions(ListingScreen<UserAdoptions>),
}

/// Opaque handle to a listing screen.
///
/// Core tickets are not `repr(C)`; the handle keeps them and hands C a
/// numeric id instead.
pub struct FfiListingScreen {
    pub(crate) inner: ScreenInner,
    pub(crate) fetches: HashMap<u64, FetchTicket>,
    pub(crate) mutations: HashMap<u64, MutationTicket>,
    pub(crate) next_mutation: u64,
}

impl FfiListingScreen {
    pub(crate) fn new(inner: ScreenInner) -> Self {
        Self {
            inner,
            fetches: HashMap::new(),
            mutations: HashMap::new(),
            next_mutation: 1,
        }
    }

    /// Remember a fetch ticket and expose the request to C.
    pub(crate) fn track_fetch(&mut self, fetch: PendingFetch) -> *mut FfiPendingRequest {
        let id = fetch.ticket.seq();
        self.fetches.insert(id, fetch.ticket);
        FfiPendingRequest::new(id, fetch.request)
    }

    pub(crate) fn track_mutation(&mut self, mutation: PendingMutation) -> *mut FfiPendingRequest {
        let id = self.next_mutation;
        self.next_mutation += 1;
        self.mutations.insert(id, mutation.ticket);
        FfiPendingRequest::new(id, mutation.request)
    }
}
