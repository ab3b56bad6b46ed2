//! Drive the C surface against the live mock server.
//!
//! The test plays the C host: it reads `FfiHttpRequest`s field by field,
//! executes them with ureq and hands the raw status and body back.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use adopta_core::{AdoptaClient, Credentials, FilePart, PetForm, PetImage};
use adopta_ffi::types::*;
use adopta_ffi::*;
use mock_server::db::{ADMIN_EMAIL, ADMIN_PASSWORD};

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn text(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string()
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Execute a request and return `(status, body)`.
fn send(method: &str, url: &str, headers: &[(String, String)], body: Option<&[u8]>) -> (u16, String) {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();
    let body = body.unwrap_or_default();
    let mut response = match method {
        "GET" => with_headers(agent.get(url), headers).call(),
        "DELETE" => with_headers(agent.delete(url), headers).call(),
        "POST" => with_headers(agent.post(url), headers).send(body),
        "PUT" => with_headers(agent.put(url), headers).send(body),
        other => panic!("unsupported method {other}"),
    }
    .expect("HTTP transport error");
    let status = response.status().as_u16();
    (status, response.body_mut().read_to_string().unwrap_or_default())
}

/// Execute an `FfiHttpRequest` the way a C host would.
fn execute(req: *const FfiHttpRequest) -> (u16, CString) {
    let req = unsafe { &*req };
    let method = match req.method {
        FfiHttpMethod::Get => "GET",
        FfiHttpMethod::Post => "POST",
        FfiHttpMethod::Put => "PUT",
        FfiHttpMethod::Delete => "DELETE",
    };
    let headers: Vec<(String, String)> = if req.headers_len == 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(req.headers, req.headers_len as usize) }
            .iter()
            .map(|h| (text(h.key), text(h.value)))
            .collect()
    };
    let body = (!req.body.is_null())
        .then(|| unsafe { std::slice::from_raw_parts(req.body, req.body_len as usize) });
    let (status, body) = send(method, &text(req.path), &headers, body);
    (status, CString::new(body).unwrap())
}

fn seed_pet(base_url: &str, name: &str) {
    let mut admin = AdoptaClient::with_base_url(base_url);
    let login = admin
        .build_login(&Credentials {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        })
        .unwrap();
    let body = login.body_bytes();
    let (status, reply) = send("POST", &login.path, &login.headers, body.as_deref());
    let session = admin
        .parse_login(adopta_core::HttpResponse::new(status, reply))
        .unwrap();
    admin.set_session(session);

    let form = PetForm {
        name: name.to_string(),
        birth_date: "2022-01-15".to_string(),
        status: "Urgente".to_string(),
        description: "Juguetona".to_string(),
        sterilized: "no".to_string(),
        size: "Pequeño".to_string(),
        weight: "4".to_string(),
        category_id: "2".to_string(),
        breed_id: "3".to_string(),
        department_id: "1".to_string(),
        municipality_id: "1".to_string(),
        sex: "Hembra".to_string(),
        images: vec![PetImage::New(FilePart {
            filename: "kira.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        })],
    };
    let req = admin.build_create_pet(&form, today()).unwrap();
    let body = req.body_bytes();
    let (status, reply) = send("POST", &req.path, &req.headers, body.as_deref());
    assert_eq!(status, 201, "{reply}");
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn mount(screen: *mut FfiListingScreen) {
    let fetch = adopta_screen_handle_event(screen, FfiScreenEvent::Mounted);
    assert!(!fetch.is_null());
    let (status, body) = execute(unsafe { &*fetch }.request);
    let resp = FfiHttpResponse {
        status,
        body: body.as_ptr(),
    };
    let ticket = unsafe { &*fetch }.ticket;
    adopta_free_pending(fetch);
    assert!(matches!(
        adopta_screen_receive(screen, ticket, &resp, std::ptr::null()),
        FfiFetchOutcome::Applied
    ));
}

fn visible_names(screen: *const FfiListingScreen) -> Vec<String> {
    let result = adopta_screen_visible_pets(screen);
    let list = unsafe { &*((*result).data as *const FfiPetList) };
    let names = if list.len == 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(list.items, list.len as usize) }
            .iter()
            .map(|p| text(p.name))
            .collect()
    };
    adopta_free_result(result);
    names
}

#[test]
fn admin_deletes_pet_through_screen_handle() {
    let base_url = start_server();
    seed_pet(&base_url, "Kira");

    let url = CString::new(base_url.as_str()).unwrap();
    let client = adopta_client_new(url.as_ptr());

    // Sign in through the C surface.
    let email = CString::new(ADMIN_EMAIL).unwrap();
    let password = CString::new(ADMIN_PASSWORD).unwrap();
    let req = adopta_build_login(client, email.as_ptr(), password.as_ptr());
    let (status, body) = execute(req);
    adopta_free_request(req);
    let resp = FfiHttpResponse {
        status,
        body: body.as_ptr(),
    };
    let result = adopta_parse_login(client, &resp);
    assert!(matches!(unsafe { &*result }.error_code, FfiErrorCode::Ok));
    adopta_free_result(result);
    assert!(adopta_client_is_authenticated(client));

    // The public catalogue shows the urgent pet.
    let public = adopta_screen_new(client, FfiScreenKind::PublicPets);
    mount(public);
    assert_eq!(visible_names(public), ["Kira"]);

    // Delete it from the admin screen; the settled mutation refetches.
    let admin = adopta_screen_new(client, FfiScreenKind::AdminPets);
    mount(admin);
    let pets = adopta_screen_visible_pets(admin);
    let list = unsafe { &*((*pets).data as *const FfiPetList) };
    let kira = unsafe { &*list.items }.id;
    adopta_free_result(pets);

    let delete = adopta_screen_delete_pet(admin, kira);
    assert!(!delete.is_null());
    let (status, body) = execute(unsafe { &*delete }.request);
    let ticket = unsafe { &*delete }.ticket;
    adopta_free_pending(delete);
    let resp = FfiHttpResponse {
        status,
        body: body.as_ptr(),
    };
    let refetch = adopta_screen_finish_mutation(admin, ticket, &resp, std::ptr::null());
    assert!(!refetch.is_null());

    let n = adopta_screen_take_notification(admin);
    assert!(matches!(unsafe { &*n }.kind, FfiNotificationKind::Success));
    assert_eq!(text(unsafe { &*n }.message), "Mascota eliminada");
    adopta_free_notification(n);

    let (status, body) = execute(unsafe { &*refetch }.request);
    let ticket = unsafe { &*refetch }.ticket;
    adopta_free_pending(refetch);
    let resp = FfiHttpResponse {
        status,
        body: body.as_ptr(),
    };
    assert!(matches!(
        adopta_screen_receive(admin, ticket, &resp, std::ptr::null()),
        FfiFetchOutcome::Applied
    ));
    assert!(visible_names(admin).is_empty());

    // A stale delete answer for an unknown ticket changes nothing.
    assert!(adopta_screen_finish_mutation(admin, ticket, &resp, std::ptr::null()).is_null());

    adopta_screen_free(public);
    adopta_screen_free(admin);
    adopta_client_free(client);
}
