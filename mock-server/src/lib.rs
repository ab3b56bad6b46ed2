//! In-memory mock of the adoption REST API.
//!
//! Serves the endpoints the client consumes, with the same paths, field
//! names and status codes, so the core can be exercised end to end without
//! the production backend. State lives in a `RwLock` and is lost on exit.

pub mod config;
pub mod db;
pub mod error;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::ServerConfig;
pub use db::{Db, ADMIN_EMAIL, ADMIN_PASSWORD};
pub use error::ServerError;

use db::{AdoptionState, NewUpload, PetInput, ProfileInput, RegisterInput, VaccineInput, WireId};

pub type SharedDb = Arc<RwLock<Db>>;

/// Header carrying the session token issued by `/validacion`.
pub const TOKEN_HEADER: &str = "token";

pub fn app() -> Router {
    let db: SharedDb = Arc::new(RwLock::new(Db::seeded()));
    Router::new()
        .route("/validacion", post(login))
        .route("/usuarios/registrar", post(register))
        .route("/registrarVisitante", post(register_guest))
        .route("/usuarios/verificar/correo/{correo}", get(check_email))
        .route(
            "/usuarios/verificar/documento_identidad/{document}",
            get(check_document),
        )
        .route("/usuarios/solicitar-reset-password", post(request_password_reset))
        .route("/usuarios/reset-password", post(reset_password))
        .route("/usuarios/update-password", post(update_password))
        .route("/usuario/listarPerfil", get(profile))
        .route("/usuario/actualizarPerfil/{document}", put(update_profile))
        .route("/mascotas/listar", get(list_pets))
        .route("/mascotas/buscar/{id}", get(get_pet))
        .route("/mascotas/registrar", post(create_pet))
        .route("/mascotas/actualizar/{id}", put(update_pet))
        .route("/mascotas/eliminar/{id}", delete(delete_pet))
        .route("/vacuna/listar", get(list_vaccines))
        .route("/vacuna/buscar/{id}", get(get_vaccine))
        .route(
            "/vacunas/listarVacunasAsociadaAMascota/{pet}",
            get(list_pet_vaccines),
        )
        .route("/vacunas/registrar", post(create_vaccine))
        .route("/adopciones/iniciar/{pet}", post(start_adoption))
        .route("/adopciones/administrar/{id}", post(administer_adoption))
        .route("/adopciones/proceso/{user}", get(list_pending_adoptions))
        .route("/adopciones/listaraceptadas/{user}", get(list_accepted_adoptions))
        .route("/categorias/listar", get(list_categories))
        .route("/razas/listarRazasPorCategoria/{category}", get(list_breeds))
        .route("/departamentos/listar", get(list_departments))
        .route(
            "/municipios/listarMunicipiosPorDepartamento/{department}",
            get(list_municipalities),
        )
        .route("/uploads/{file}", get(serve_upload))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

fn token(headers: &HeaderMap) -> Option<&str> {
    headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok())
}

fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Credentials {
    correo: String,
    password: String,
}

async fn login(
    State(db): State<SharedDb>,
    Json(input): Json<Credentials>,
) -> Result<Json<Value>, ServerError> {
    let (token, user) = db.write().await.login(&input.correo, &input.password)?;
    // The production API wraps the user in a one-element array.
    Ok(Json(json!({ "token": token, "user": [user] })))
}

/// Text fields and files of a multipart body. Parts named in `file_fields`
/// are read as files; everything else as text, in arrival order.
#[derive(Default)]
struct FormParts {
    texts: Vec<(String, String)>,
    files: Vec<(String, NewUpload)>,
}

impl FormParts {
    fn take(&mut self, name: &str) -> String {
        self.texts
            .iter()
            .position(|(k, _)| k == name)
            .map(|i| self.texts.remove(i).1)
            .unwrap_or_default()
    }

    fn take_file(&mut self, name: &str) -> Option<NewUpload> {
        self.files
            .iter()
            .position(|(k, _)| k == name)
            .map(|i| self.files.remove(i).1)
    }
}

async fn read_parts(
    mut multipart: Multipart,
    file_fields: &[&str],
) -> Result<FormParts, ServerError> {
    let mut parts = FormParts::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("multipart error: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if file_fields.contains(&name.as_str()) {
            let filename = field.file_name().unwrap_or("image").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("failed to read file: {e}")))?;
            parts.files.push((
                name,
                NewUpload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                },
            ));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ServerError::BadRequest(format!("failed to read field: {e}")))?;
            parts.texts.push((name, value));
        }
    }
    Ok(parts)
}

async fn register(
    State(db): State<SharedDb>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    let mut parts = read_parts(multipart, &["img"]).await?;
    let input = RegisterInput {
        nombre: parts.take("nombre"),
        apellido: parts.take("apellido"),
        direccion: parts.take("direccion"),
        correo: parts.take("correo"),
        telefono: parts.take("telefono"),
        tipo_documento: parts.take("tipo_documento"),
        documento_identidad: parts.take("documento_identidad"),
        password: parts.take("password"),
        rol: parts.take("rol"),
        img: parts.take_file("img"),
    };
    let id = db.write().await.register(input)?;
    info!(user = id, "user registered");
    Ok((StatusCode::CREATED, message("Usuario registrado")))
}

async fn register_guest(
    State(db): State<SharedDb>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    let mut parts = read_parts(multipart, &[]).await?;
    let input = RegisterInput {
        documento_identidad: parts.take("identificacion"),
        nombre: parts.take("nombre"),
        apellido: parts.take("apellido"),
        correo: parts.take("correo"),
        password: parts.take("password"),
        telefono: parts.take("telefono"),
        ..RegisterInput::default()
    };
    let id = db.write().await.register(input)?;
    info!(user = id, "visitor registered");
    Ok((StatusCode::CREATED, message("Usuario registrado correctamente")))
}

async fn check_email(State(db): State<SharedDb>, Path(correo): Path<String>) -> Json<Value> {
    Json(json!({ "existe": db.read().await.email_exists(&correo) }))
}

async fn check_document(
    State(db): State<SharedDb>,
    Path(document): Path<String>,
) -> Json<Value> {
    Json(json!({ "existe": db.read().await.document_exists(&document) }))
}

#[derive(Deserialize)]
struct ResetRequest {
    correo: String,
}

#[derive(Deserialize)]
struct NewPassword {
    correo: String,
    #[serde(default)]
    token: String,
    password: String,
}

async fn request_password_reset(
    State(db): State<SharedDb>,
    Json(input): Json<ResetRequest>,
) -> Result<Json<Value>, ServerError> {
    let token = db.write().await.request_password_reset(&input.correo)?;
    info!("password reset requested");
    // The production API returns the token instead of mailing it.
    Ok(Json(json!({
        "message": "Se ha enviado un correo para restablecer la contraseña",
        "token": token,
    })))
}

async fn reset_password(
    State(db): State<SharedDb>,
    Json(input): Json<NewPassword>,
) -> Result<Json<Value>, ServerError> {
    db.write()
        .await
        .reset_password(&input.correo, &input.token, &input.password)?;
    Ok(message("Contraseña restablecida"))
}

async fn update_password(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(input): Json<NewPassword>,
) -> Result<Json<Value>, ServerError> {
    let mut db = db.write().await;
    let user = db.authorize(token(&headers))?;
    db.update_password(user, &input.correo, &input.password)?;
    Ok(message("Contraseña actualizada"))
}

async fn update_profile(
    State(db): State<SharedDb>,
    Path(document): Path<String>,
    headers: HeaderMap,
    Json(input): Json<ProfileInput>,
) -> Result<Json<Value>, ServerError> {
    let mut db = db.write().await;
    let user = db.authorize(token(&headers))?;
    let data = db.update_profile(user, &document, input)?;
    Ok(Json(json!({
        "status": 200,
        "message": "Perfil actualizado",
        "data": data,
    })))
}

async fn profile(
    State(db): State<SharedDb>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServerError> {
    let db = db.read().await;
    let user = db.authorize(token(&headers))?;
    Ok(Json(json!([db.profile(user)?])))
}

// ---------------------------------------------------------------------------
// Pets
// ---------------------------------------------------------------------------

async fn list_pets(State(db): State<SharedDb>) -> Json<Vec<Value>> {
    Json(db.read().await.list_pets())
}

async fn get_pet(
    State(db): State<SharedDb>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ServerError> {
    db.read().await.get_pet(id).map(Json)
}

/// Decode a multipart pet form: text fields, `imagenes` files and the
/// `imagenesExistentes[]` names to keep.
async fn read_pet_form(multipart: Multipart) -> Result<PetInput, ServerError> {
    let parts = read_parts(multipart, &["imagenes"]).await?;
    let mut input = PetInput {
        uploads: parts.files.into_iter().map(|(_, file)| file).collect(),
        ..PetInput::default()
    };
    for (name, value) in parts.texts {
        match name.as_str() {
            "imagenesExistentes[]" | "imagenesExistentes" => input.retained.push(value),
            _ => {
                input.fields.insert(name, value);
            }
        }
    }
    Ok(input)
}

async fn create_pet(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    db.read().await.authorize(token(&headers))?;
    let input = read_pet_form(multipart).await?;
    let id = db.write().await.create_pet(input)?;
    info!(pet = id, "pet registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Mascota registrada", "id_mascota": id })),
    ))
}

async fn update_pet(
    State(db): State<SharedDb>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<Value>, ServerError> {
    db.read().await.authorize(token(&headers))?;
    let input = read_pet_form(multipart).await?;
    db.write().await.update_pet(id, input)?;
    Ok(message("Mascota actualizada"))
}

async fn delete_pet(
    State(db): State<SharedDb>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServerError> {
    let mut db = db.write().await;
    db.authorize(token(&headers))?;
    db.delete_pet(id)?;
    info!(pet = id, "pet deleted");
    Ok(message("Mascota eliminada"))
}

async fn serve_upload(
    State(db): State<SharedDb>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let db = db.read().await;
    let upload = db.upload(&file).ok_or(ServerError::NotFound("image"))?;
    Ok((
        [(header::CONTENT_TYPE, upload.content_type.clone())],
        upload.bytes.clone(),
    ))
}

// ---------------------------------------------------------------------------
// Vaccines
// ---------------------------------------------------------------------------

async fn list_vaccines(State(db): State<SharedDb>) -> Json<Vec<Value>> {
    Json(db.read().await.list_vaccines(None))
}

async fn list_pet_vaccines(
    State(db): State<SharedDb>,
    Path(pet): Path<u64>,
) -> Json<Vec<Value>> {
    Json(db.read().await.list_vaccines(Some(pet)))
}

async fn get_vaccine(
    State(db): State<SharedDb>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ServerError> {
    db.read().await.get_vaccine(id).map(Json)
}

async fn create_vaccine(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(input): Json<VaccineInput>,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    let mut db = db.write().await;
    db.authorize(token(&headers))?;
    db.create_vaccine(input)?;
    Ok((StatusCode::CREATED, message("Vacuna registrada")))
}

// ---------------------------------------------------------------------------
// Adoptions
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct StartAdoption {
    id_usuario: WireId,
}

#[derive(Deserialize)]
struct AdministerAdoption {
    accion: String,
}

async fn start_adoption(
    State(db): State<SharedDb>,
    Path(pet): Path<u64>,
    headers: HeaderMap,
    Json(input): Json<StartAdoption>,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    let user = input.id_usuario.value("id_usuario")?;
    let mut db = db.write().await;
    db.authorize(token(&headers))?;
    let id = db.start_adoption(pet, user, &today())?;
    info!(adoption = id, pet, user, "adoption started");
    Ok((StatusCode::CREATED, message("Solicitud de adopción enviada")))
}

async fn administer_adoption(
    State(db): State<SharedDb>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(input): Json<AdministerAdoption>,
) -> Result<Json<Value>, ServerError> {
    let mut db = db.write().await;
    db.authorize(token(&headers))?;
    let state = db.administer_adoption(id, &input.accion, &today())?;
    info!(adoption = id, ?state, "adoption administered");
    Ok(match state {
        AdoptionState::Accepted => message("Adopción aceptada"),
        _ => message("Adopción denegada"),
    })
}

async fn list_pending_adoptions(
    State(db): State<SharedDb>,
    Path(user): Path<u64>,
) -> Json<Vec<Value>> {
    Json(db.read().await.list_adoptions(user, AdoptionState::InProcess))
}

async fn list_accepted_adoptions(
    State(db): State<SharedDb>,
    Path(user): Path<u64>,
) -> Json<Vec<Value>> {
    Json(db.read().await.list_adoptions(user, AdoptionState::Accepted))
}

// ---------------------------------------------------------------------------
// Catalogs
// ---------------------------------------------------------------------------

async fn list_categories(State(db): State<SharedDb>) -> Json<Vec<Value>> {
    Json(db.read().await.list_categories())
}

async fn list_breeds(
    State(db): State<SharedDb>,
    Path(category): Path<u64>,
) -> Json<Vec<Value>> {
    Json(db.read().await.list_breeds(category))
}

async fn list_departments(State(db): State<SharedDb>) -> Json<Vec<Value>> {
    Json(db.read().await.list_departments())
}

async fn list_municipalities(
    State(db): State<SharedDb>,
    Path(department): Path<u64>,
) -> Json<Vec<Value>> {
    Json(db.read().await.list_municipalities(department))
}
