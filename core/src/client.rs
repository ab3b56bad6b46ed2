//! HTTP request builder and response parser for the adoption API.
//!
//! # Design
//! `AdoptaClient` holds only its configuration and the session; it carries
//! no mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. The host executes the round trip in between, keeping
//! the core deterministic and free of I/O.
//!
//! Form-backed mutations validate their input first; a rejected form
//! produces `ApiError::Validation` and no request.

use chrono::NaiveDate;
use serde_json::json;

use crate::adapter;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
use crate::session::Session;
use crate::types::{
    AdoptionAction, AdoptionId, AdoptionRequest, AdoptionStage, Breed, Category, Credentials,
    Department, GuestRegistration, Municipality, MutationOutcome, PasswordChange, PasswordReset,
    Pet, PetForm, PetId, PetImage, ProfileUpdate, RegisterUser, ResetRequested, User, UserId,
    Vaccine, VaccineForm, VaccineId,
};
use crate::validation;

#[derive(Debug, Clone)]
pub struct AdoptaClient {
    config: ClientConfig,
    session: Session,
}

impl AdoptaClient {
    pub fn new(config: ClientConfig, session: Session) -> Self {
        Self { config, session }
    }

    /// Guest client against `base_url` with default settings.
    pub fn with_base_url(base_url: &str) -> Self {
        Self::new(ClientConfig::new(base_url), Session::guest())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Replace the session, e.g. after login or logout.
    pub fn set_session(&mut self, session: Session) {
        self.session = session;
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.config.endpoint(path)).with_headers(self.session.headers())
    }

    fn json_request(
        &self,
        method: HttpMethod,
        path: &str,
        payload: &impl serde::Serialize,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(method, path).with_body(RequestBody::Json(body)))
    }

    // -----------------------------------------------------------------------
    // Pets
    // -----------------------------------------------------------------------

    pub fn build_list_pets(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/mascotas/listar")
    }

    pub fn build_get_pet(&self, id: PetId) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/mascotas/buscar/{id}"))
    }

    pub fn build_create_pet(&self, form: &PetForm, today: NaiveDate) -> Result<HttpRequest, ApiError> {
        validation::validate_pet_form(form, today)?;
        Ok(self
            .request(HttpMethod::Post, "/mascotas/registrar")
            .with_body(RequestBody::Multipart(pet_form_to_multipart(form))))
    }

    pub fn build_update_pet(
        &self,
        id: PetId,
        form: &PetForm,
        today: NaiveDate,
    ) -> Result<HttpRequest, ApiError> {
        validation::validate_pet_form(form, today)?;
        Ok(self
            .request(HttpMethod::Put, &format!("/mascotas/actualizar/{id}"))
            .with_body(RequestBody::Multipart(pet_form_to_multipart(form))))
    }

    pub fn build_delete_pet(&self, id: PetId) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/mascotas/eliminar/{id}"))
    }

    pub fn parse_list_pets(&self, response: HttpResponse) -> Result<Vec<Pet>, ApiError> {
        check_status(&response)?;
        adapter::list(&response.body, adapter::pet)
    }

    pub fn parse_get_pet(&self, response: HttpResponse) -> Result<Pet, ApiError> {
        check_status(&response)?;
        adapter::one(&response.body, adapter::pet)
    }

    // -----------------------------------------------------------------------
    // Vaccines
    // -----------------------------------------------------------------------

    pub fn build_list_vaccines(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/vacuna/listar")
    }

    pub fn build_get_vaccine(&self, id: VaccineId) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/vacuna/buscar/{id}"))
    }

    pub fn build_list_pet_vaccines(&self, pet: PetId) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!("/vacunas/listarVacunasAsociadaAMascota/{pet}"),
        )
    }

    pub fn build_create_vaccine(
        &self,
        form: &VaccineForm,
        today: NaiveDate,
    ) -> Result<HttpRequest, ApiError> {
        validation::validate_vaccine_form(form, today)?;
        self.json_request(HttpMethod::Post, "/vacunas/registrar", form)
    }

    pub fn parse_list_vaccines(&self, response: HttpResponse) -> Result<Vec<Vaccine>, ApiError> {
        check_status(&response)?;
        adapter::list(&response.body, adapter::vaccine)
    }

    pub fn parse_get_vaccine(&self, response: HttpResponse) -> Result<Vaccine, ApiError> {
        check_status(&response)?;
        adapter::one(&response.body, adapter::vaccine)
    }

    // -----------------------------------------------------------------------
    // Adoptions
    // -----------------------------------------------------------------------

    /// Ask to adopt `pet` as the signed-in user.
    pub fn build_start_adoption(&self, pet: PetId) -> Result<HttpRequest, ApiError> {
        let user_id = self.session.user_id()?;
        self.json_request(
            HttpMethod::Post,
            &format!("/adopciones/iniciar/{pet}"),
            &json!({ "id_usuario": user_id }),
        )
    }

    pub fn build_administer_adoption(
        &self,
        adoption: AdoptionId,
        action: AdoptionAction,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            &format!("/adopciones/administrar/{adoption}"),
            &json!({ "accion": action.as_str() }),
        )
    }

    pub fn build_list_pending_adoptions(&self, user: UserId) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/adopciones/proceso/{user}"))
    }

    pub fn build_list_accepted_adoptions(&self, user: UserId) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/adopciones/listaraceptadas/{user}"))
    }

    pub fn parse_list_adoptions(
        &self,
        response: HttpResponse,
        stage: AdoptionStage,
    ) -> Result<Vec<AdoptionRequest>, ApiError> {
        check_status(&response)?;
        adapter::list(&response.body, |v| adapter::adoption(v, stage))
    }

    /// Parse the reply to any create/update/delete/adopt/deny request.
    pub fn parse_mutation(&self, response: HttpResponse) -> Result<MutationOutcome, ApiError> {
        check_status(&response)?;
        Ok(MutationOutcome {
            message: adapter::message(&response.body),
        })
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        validation::validate_credentials(credentials)?;
        self.json_request(HttpMethod::Post, "/validacion", credentials)
    }

    /// Returns the authenticated session to install with `set_session`.
    pub fn parse_login(&self, response: HttpResponse) -> Result<Session, ApiError> {
        check_status(&response)?;
        let value: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        adapter::login(&value)
    }

    /// Ask whether an account already uses `email`. Run before `build_register`.
    pub fn build_check_email(&self, email: &str) -> Result<HttpRequest, ApiError> {
        validation::validate_email(email)?;
        Ok(self.request(
            HttpMethod::Get,
            &format!("/usuarios/verificar/correo/{}", path_segment(email)),
        ))
    }

    /// `true` when the address is taken.
    pub fn parse_check_email(&self, response: HttpResponse) -> Result<bool, ApiError> {
        check_status(&response)?;
        adapter::exists(&response.body)
    }

    pub fn build_check_document(&self, document: &str) -> Result<HttpRequest, ApiError> {
        validation::validate_document(document)?;
        Ok(self.request(
            HttpMethod::Get,
            &format!("/usuarios/verificar/documento_identidad/{}", path_segment(document)),
        ))
    }

    /// `true` when the identity document is taken.
    pub fn parse_check_document(&self, response: HttpResponse) -> Result<bool, ApiError> {
        check_status(&response)?;
        adapter::exists(&response.body)
    }

    /// Multipart sign-up; the photo goes in the `img` part when present.
    pub fn build_register(&self, form: &RegisterUser) -> Result<HttpRequest, ApiError> {
        validation::validate_registration(form)?;
        let mut multipart = MultipartForm::new()
            .text("nombre", &form.name)
            .text("apellido", &form.surname)
            .text("direccion", &form.address)
            .text("telefono", &form.phone)
            .text("correo", &form.email)
            .text("tipo_documento", &form.document_type)
            .text("documento_identidad", &form.document)
            .text("password", &form.password)
            .text("rol", &form.role);
        if let Some(photo) = &form.photo {
            multipart = multipart.file("img", photo.clone());
        }
        Ok(self
            .request(HttpMethod::Post, "/usuarios/registrar")
            .with_body(RequestBody::Multipart(multipart)))
    }

    pub fn build_register_guest(&self, form: &GuestRegistration) -> Result<HttpRequest, ApiError> {
        validation::validate_guest_registration(form)?;
        let multipart = MultipartForm::new()
            .text("identificacion", &form.document)
            .text("nombre", &form.name)
            .text("apellido", &form.surname)
            .text("correo", &form.email)
            .text("password", &form.password)
            .text("telefono", &form.phone);
        Ok(self
            .request(HttpMethod::Post, "/registrarVisitante")
            .with_body(RequestBody::Multipart(multipart)))
    }

    pub fn build_request_password_reset(&self, email: &str) -> Result<HttpRequest, ApiError> {
        validation::validate_email(email)?;
        self.json_request(
            HttpMethod::Post,
            "/usuarios/solicitar-reset-password",
            &json!({ "correo": email }),
        )
    }

    pub fn parse_request_password_reset(
        &self,
        response: HttpResponse,
    ) -> Result<ResetRequested, ApiError> {
        check_status(&response)?;
        Ok(adapter::reset_requested(&response.body))
    }

    /// Set a new password with the token from `parse_request_password_reset`.
    pub fn build_reset_password(&self, form: &PasswordReset) -> Result<HttpRequest, ApiError> {
        validation::validate_password_reset(form)?;
        self.json_request(HttpMethod::Post, "/usuarios/reset-password", form)
    }

    pub fn build_update_password(&self, form: &PasswordChange) -> Result<HttpRequest, ApiError> {
        self.session.user_id()?;
        validation::validate_password_change(form)?;
        self.json_request(HttpMethod::Post, "/usuarios/update-password", form)
    }

    /// Update the signed-in user's profile, addressed by identity document.
    pub fn build_update_profile(&self, form: &ProfileUpdate) -> Result<HttpRequest, ApiError> {
        let document = self
            .session
            .user()
            .ok_or(ApiError::Unauthenticated)?
            .document
            .clone()
            .unwrap_or_default();
        validation::validate_profile_update(form)?;
        validation::validate_document(&document)?;
        self.json_request(
            HttpMethod::Put,
            &format!("/usuario/actualizarPerfil/{}", path_segment(&document)),
            form,
        )
    }

    /// The profile endpoint may answer 200 with a failing `status` inside.
    pub fn parse_update_profile(&self, response: HttpResponse) -> Result<MutationOutcome, ApiError> {
        check_status(&response)?;
        match adapter::embedded_status(&response.body) {
            Some(status) if !(200..300).contains(&status) => Err(ApiError::Server {
                status,
                message: adapter::message(&response.body)
                    .unwrap_or_else(|| format!("request failed with status {status}")),
            }),
            _ => self.parse_mutation(response),
        }
    }

    pub fn build_get_profile(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/usuario/listarPerfil")
    }

    pub fn parse_get_profile(&self, response: HttpResponse) -> Result<User, ApiError> {
        check_status(&response)?;
        adapter::one(&response.body, adapter::user)
    }

    // -----------------------------------------------------------------------
    // Catalogs (cascading pickers)
    // -----------------------------------------------------------------------

    pub fn build_list_categories(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/categorias/listar")
    }

    pub fn build_list_breeds(&self, category: u64) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!("/razas/listarRazasPorCategoria/{category}"),
        )
    }

    pub fn build_list_departments(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/departamentos/listar")
    }

    pub fn build_list_municipalities(&self, department: u64) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!("/municipios/listarMunicipiosPorDepartamento/{department}"),
        )
    }

    /// Only active categories are offered in the picker.
    pub fn parse_list_categories(&self, response: HttpResponse) -> Result<Vec<Category>, ApiError> {
        check_status(&response)?;
        let all = adapter::list(&response.body, adapter::category)?;
        Ok(all.into_iter().filter(|c| c.active).collect())
    }

    pub fn parse_list_breeds(&self, response: HttpResponse) -> Result<Vec<Breed>, ApiError> {
        check_status(&response)?;
        adapter::list(&response.body, adapter::breed)
    }

    pub fn parse_list_departments(&self, response: HttpResponse) -> Result<Vec<Department>, ApiError> {
        check_status(&response)?;
        adapter::list(&response.body, adapter::department)
    }

    pub fn parse_list_municipalities(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<Municipality>, ApiError> {
        check_status(&response)?;
        adapter::list(&response.body, adapter::municipality)
    }
}

fn pet_form_to_multipart(form: &PetForm) -> MultipartForm {
    let mut multipart = MultipartForm::new()
        .text("nombre_mascota", &form.name)
        .text("fecha_nacimiento", &form.birth_date)
        .text("estado", &form.status)
        .text("descripcion", &form.description)
        .text("esterilizado", &form.sterilized)
        .text("tamano", &form.size)
        .text("peso", &form.weight)
        .text("fk_id_categoria", &form.category_id)
        .text("fk_id_raza", &form.breed_id)
        .text("fk_id_departamento", &form.department_id)
        .text("fk_id_municipio", &form.municipality_id)
        .text("sexo", &form.sex);
    for image in &form.images {
        multipart = match image {
            PetImage::New(file) => multipart.file("imagenes", file.clone()),
            PetImage::Existing(name) => multipart.text("imagenesExistentes[]", name),
        };
    }
    multipart
}

/// Percent-encode one path segment; unreserved characters and `@` pass.
fn path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'@' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    let message = adapter::message(&response.body).unwrap_or_else(|| {
        let trimmed = response.body.trim();
        if trimmed.is_empty() {
            format!("request failed with status {}", response.status)
        } else {
            trimmed.to_string()
        }
    });
    Err(ApiError::Server {
        status: response.status,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::FilePart;
    use crate::types::{PetStatus, Role};

    fn client() -> AdoptaClient {
        AdoptaClient::with_base_url("http://localhost:3000")
    }

    fn signed_in() -> AdoptaClient {
        let user = User {
            id: 4,
            name: "Ana".to_string(),
            surname: None,
            email: None,
            phone: None,
            document: None,
            role: Role::Usuario,
        };
        AdoptaClient::new(
            ClientConfig::new("http://localhost:3000"),
            Session::authenticated("tok".to_string(), user),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn pet_form() -> PetForm {
        PetForm {
            name: "Rex".to_string(),
            birth_date: "2020-01-01".to_string(),
            status: "Urgente".to_string(),
            description: "Tranquilo".to_string(),
            sterilized: "no".to_string(),
            size: "Grande".to_string(),
            weight: "30".to_string(),
            category_id: "1".to_string(),
            breed_id: "1".to_string(),
            department_id: "1".to_string(),
            municipality_id: "1".to_string(),
            sex: "Macho".to_string(),
            images: vec![
                PetImage::Existing("old.jpg".to_string()),
                PetImage::New(FilePart {
                    filename: "new.jpg".to_string(),
                    content_type: "image/jpeg".to_string(),
                    bytes: vec![1, 2, 3],
                }),
            ],
        }
    }

    #[test]
    fn build_list_pets_produces_correct_request() {
        let req = client().build_list_pets();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/mascotas/listar");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn session_token_is_attached() {
        let req = signed_in().build_list_pets();
        assert_eq!(req.header("token"), Some("tok"));
    }

    #[test]
    fn build_create_pet_is_multipart() {
        let req = signed_in().build_create_pet(&pet_form(), today()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/mascotas/registrar");
        assert!(req
            .header("content-type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
        match req.body.unwrap() {
            RequestBody::Multipart(form) => {
                assert_eq!(form.text_values("nombre_mascota"), vec!["Rex"]);
                assert_eq!(form.text_values("imagenesExistentes[]"), vec!["old.jpg"]);
                assert_eq!(form.files("imagenes")[0].filename, "new.jpg");
            }
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[test]
    fn invalid_pet_form_builds_no_request() {
        let form = PetForm {
            name: String::new(),
            ..pet_form()
        };
        let err = signed_in().build_update_pet(3, &form, today()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn build_delete_pet_produces_correct_request() {
        let req = client().build_delete_pet(9);
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "http://localhost:3000/mascotas/eliminar/9");
    }

    #[test]
    fn start_adoption_requires_sign_in() {
        let err = client().build_start_adoption(1).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[test]
    fn start_adoption_sends_user_id() {
        let req = signed_in().build_start_adoption(7).unwrap();
        assert_eq!(req.path, "http://localhost:3000/adopciones/iniciar/7");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: serde_json::Value =
            serde_json::from_str(req.body.as_ref().unwrap().as_json().unwrap()).unwrap();
        assert_eq!(body["id_usuario"], 4);
    }

    #[test]
    fn deny_adoption_sends_action() {
        let req = signed_in()
            .build_administer_adoption(12, AdoptionAction::Deny)
            .unwrap();
        assert_eq!(req.path, "http://localhost:3000/adopciones/administrar/12");
        let body: serde_json::Value =
            serde_json::from_str(req.body.as_ref().unwrap().as_json().unwrap()).unwrap();
        assert_eq!(body["accion"], "denegar");
    }

    #[test]
    fn parse_list_pets_success() {
        let response = HttpResponse::new(
            200,
            r#"[{"id_mascota":1,"nombre_mascota":"Fido","estado":"Adoptado","imagenes":"a.jpg"}]"#,
        );
        let pets = client().parse_list_pets(response).unwrap();
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0].name, "Fido");
        assert_eq!(pets[0].status, PetStatus::Adoptado);
    }

    #[test]
    fn parse_get_pet_not_found() {
        let err = client().parse_get_pet(HttpResponse::new(404, "")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn server_message_is_surfaced() {
        let response = HttpResponse::new(500, r#"{"message":"Error al eliminar la mascota"}"#);
        let err = client().parse_mutation(response).unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 500,
                message: "Error al eliminar la mascota".to_string()
            }
        );
    }

    #[test]
    fn empty_error_body_gets_generic_message() {
        let err = client().parse_mutation(HttpResponse::new(502, "")).unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502: request failed with status 502");
    }

    #[test]
    fn any_2xx_is_mutation_success() {
        let outcome = client()
            .parse_mutation(HttpResponse::new(201, r#"{"message":"Mascota registrada"}"#))
            .unwrap();
        assert_eq!(outcome.message.as_deref(), Some("Mascota registrada"));
        assert!(client().parse_mutation(HttpResponse::new(204, "")).is_ok());
    }

    #[test]
    fn inactive_categories_are_dropped() {
        let response = HttpResponse::new(
            200,
            r#"[{"id_categoria":1,"nombre_categoria":"Perro","estado":"activa"},
                {"id_categoria":2,"nombre_categoria":"Ave","estado":"inactiva"}]"#,
        );
        let categories = client().parse_list_categories(response).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Perro");
    }

    #[test]
    fn breeds_follow_selected_category() {
        let req = client().build_list_breeds(2);
        assert_eq!(req.path, "http://localhost:3000/razas/listarRazasPorCategoria/2");
        let req = client().build_list_municipalities(5);
        assert_eq!(
            req.path,
            "http://localhost:3000/municipios/listarMunicipiosPorDepartamento/5"
        );
    }

    #[test]
    fn parse_login_returns_session() {
        let response = HttpResponse::new(
            200,
            r#"{"token":"jwt","user":{"id_usuario":3,"nombre":"Luis","rol":"administrador"}}"#,
        );
        let session = client().parse_login(response).unwrap();
        assert!(session.is_admin());
        assert_eq!(session.token(), Some("jwt"));
    }

    #[test]
    fn parse_list_pets_bad_json() {
        let err = client()
            .parse_list_pets(HttpResponse::new(200, "not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    fn registration() -> RegisterUser {
        RegisterUser {
            name: "Laura".to_string(),
            surname: "Díaz".to_string(),
            address: "Carrera 7 # 10-20".to_string(),
            phone: "3001234567".to_string(),
            email: "laura@example.com".to_string(),
            document_type: "cedula".to_string(),
            document: "10203040".to_string(),
            password: "secreto123".to_string(),
            ..RegisterUser::default()
        }
    }

    #[test]
    fn register_is_multipart_with_optional_photo() {
        let req = client().build_register(&registration()).unwrap();
        assert_eq!(req.path, "http://localhost:3000/usuarios/registrar");
        match req.body.as_ref().unwrap() {
            RequestBody::Multipart(form) => {
                assert_eq!(form.text_values("direccion"), vec!["Carrera 7 # 10-20"]);
                assert_eq!(form.text_values("tipo_documento"), vec!["cedula"]);
                assert_eq!(form.text_values("rol"), vec!["usuario"]);
                assert!(form.files("img").is_empty());
            }
            other => panic!("expected multipart, got {other:?}"),
        }

        let with_photo = RegisterUser {
            photo: Some(FilePart {
                filename: "yo.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                bytes: vec![0xFF, 0xD8],
            }),
            ..registration()
        };
        let req = client().build_register(&with_photo).unwrap();
        match req.body.unwrap() {
            RequestBody::Multipart(form) => assert_eq!(form.files("img")[0].filename, "yo.jpg"),
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[test]
    fn availability_checks_escape_the_value() {
        let req = client().build_check_email("ana+1@example.com").unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.path,
            "http://localhost:3000/usuarios/verificar/correo/ana%2B1@example.com"
        );
        let req = client().build_check_document("1020304").unwrap();
        assert_eq!(
            req.path,
            "http://localhost:3000/usuarios/verificar/documento_identidad/1020304"
        );
        assert!(client().build_check_document("12").is_err());

        let taken = client().parse_check_email(HttpResponse::new(200, r#"{"existe":true}"#));
        assert_eq!(taken, Ok(true));
        let free = client().parse_check_document(HttpResponse::new(200, r#"{"existe":false}"#));
        assert_eq!(free, Ok(false));
    }

    #[test]
    fn guest_registration_uses_visitor_endpoint() {
        let form = GuestRegistration {
            document: "5566778".to_string(),
            name: "Luis".to_string(),
            surname: "Mora".to_string(),
            email: "luis@example.com".to_string(),
            password: "secreto123".to_string(),
            phone: "3109876543".to_string(),
        };
        let req = client().build_register_guest(&form).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/registrarVisitante");
        match req.body.unwrap() {
            RequestBody::Multipart(form) => {
                assert_eq!(form.text_values("identificacion"), vec!["5566778"])
            }
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[test]
    fn password_reset_round() {
        let req = client().build_request_password_reset("ana@example.com").unwrap();
        assert_eq!(req.path, "http://localhost:3000/usuarios/solicitar-reset-password");
        let body: serde_json::Value =
            serde_json::from_str(req.body.as_ref().unwrap().as_json().unwrap()).unwrap();
        assert_eq!(body["correo"], "ana@example.com");

        let reply = client()
            .parse_request_password_reset(HttpResponse::new(
                200,
                r#"{"message":"Revisa tu correo","token":"r-9"}"#,
            ))
            .unwrap();
        assert_eq!(reply.token.as_deref(), Some("r-9"));

        let req = client()
            .build_reset_password(&PasswordReset {
                email: "ana@example.com".to_string(),
                token: "r-9".to_string(),
                password: "nuevaClave1".to_string(),
            })
            .unwrap();
        assert_eq!(req.path, "http://localhost:3000/usuarios/reset-password");
        let body: serde_json::Value =
            serde_json::from_str(req.body.as_ref().unwrap().as_json().unwrap()).unwrap();
        assert_eq!(body["token"], "r-9");
        assert_eq!(body["password"], "nuevaClave1");
    }

    #[test]
    fn password_change_requires_sign_in() {
        let form = PasswordChange {
            email: "ana@example.com".to_string(),
            password: "nuevaClave1".to_string(),
        };
        assert!(matches!(
            client().build_update_password(&form),
            Err(ApiError::Unauthenticated)
        ));
        let req = signed_in().build_update_password(&form).unwrap();
        assert_eq!(req.path, "http://localhost:3000/usuarios/update-password");
        assert_eq!(req.header("token"), Some("tok"));
    }

    #[test]
    fn profile_update_addresses_document() {
        let mut user = signed_in().session().user().cloned().unwrap();
        user.document = Some("10203040".to_string());
        let client = AdoptaClient::new(
            ClientConfig::new("http://localhost:3000"),
            Session::authenticated("tok".to_string(), user),
        );
        let form = ProfileUpdate {
            name: "Ana".to_string(),
            surname: "Ríos".to_string(),
            email: "ana@example.com".to_string(),
        };
        let req = client.build_update_profile(&form).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:3000/usuario/actualizarPerfil/10203040");
        let body: serde_json::Value =
            serde_json::from_str(req.body.as_ref().unwrap().as_json().unwrap()).unwrap();
        assert_eq!(body["nombres"], "Ana");
        assert_eq!(body["apellidos"], "Ríos");

        // Accounts without a document on file cannot be addressed.
        assert!(matches!(
            signed_in().build_update_profile(&form),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn profile_reply_with_failing_inner_status_is_an_error() {
        let err = client()
            .parse_update_profile(HttpResponse::new(
                200,
                r#"{"status":403,"message":"No autorizado"}"#,
            ))
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 403,
                message: "No autorizado".to_string()
            }
        );
        let ok = client()
            .parse_update_profile(HttpResponse::new(
                200,
                r#"{"status":200,"message":"Perfil actualizado"}"#,
            ))
            .unwrap();
        assert_eq!(ok.message.as_deref(), Some("Perfil actualizado"));
    }
}
