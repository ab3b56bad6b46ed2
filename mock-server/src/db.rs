//! In-memory backend state.
//!
//! Records are rendered with the same field names the production API uses,
//! including its joins (a pet carries both `fk_id_raza` and the breed name in
//! `raza`), so the client's adapter is exercised against realistic payloads.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ServerError;

pub const ADMIN_EMAIL: &str = "admin@adopta.test";
pub const ADMIN_PASSWORD: &str = "admin12345";

const ADOPTABLE: [&str; 2] = ["En Adopcion", "Urgente"];

/// Text fields a pet must have on creation, by wire name.
const PET_FIELDS: [&str; 12] = [
    "nombre_mascota",
    "fecha_nacimiento",
    "estado",
    "descripcion",
    "esterilizado",
    "tamano",
    "peso",
    "fk_id_categoria",
    "fk_id_raza",
    "fk_id_departamento",
    "fk_id_municipio",
    "sexo",
];

/// An id sent either as a JSON number or as a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    pub fn value(&self, field: &str) -> Result<u64, ServerError> {
        match self {
            WireId::Number(n) => Ok(*n),
            WireId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ServerError::BadRequest(format!("{field} must be numeric"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaccineInput {
    pub fk_id_mascota: WireId,
    pub fecha_vacuna: String,
    pub enfermedad: String,
    pub estado: String,
}

/// A decoded multipart sign-up, from `/usuarios/registrar` or `/registrarVisitante`.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub nombre: String,
    pub apellido: String,
    pub direccion: String,
    pub correo: String,
    pub telefono: String,
    pub tipo_documento: String,
    pub documento_identidad: String,
    pub password: String,
    pub rol: String,
    pub img: Option<NewUpload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub nombres: String,
    pub apellidos: String,
    pub correo: String,
}

/// A file received in a multipart pet form.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A decoded multipart pet form.
#[derive(Debug, Clone, Default)]
pub struct PetInput {
    pub fields: HashMap<String, String>,
    /// Images of the existing record to keep (`imagenesExistentes[]`).
    pub retained: Vec<String>,
    pub uploads: Vec<NewUpload>,
}

impl PetInput {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
struct PetRow {
    id: u64,
    fields: HashMap<String, String>,
    images: Vec<String>,
}

impl PetRow {
    fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }

    fn status(&self) -> &str {
        self.get("estado")
    }

    fn fk(&self, name: &str) -> Option<u64> {
        self.get(name).parse().ok()
    }
}

#[derive(Debug, Clone)]
struct VaccineRow {
    id: u64,
    pet_id: u64,
    date: String,
    disease: String,
    status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdoptionState {
    InProcess,
    Accepted,
    Denied,
}

impl AdoptionState {
    fn as_str(self) -> &'static str {
        match self {
            AdoptionState::InProcess => "proceso",
            AdoptionState::Accepted => "aceptada",
            AdoptionState::Denied => "rechazada",
        }
    }
}

#[derive(Debug, Clone)]
struct AdoptionRow {
    id: u64,
    pet_id: u64,
    user_id: u64,
    state: AdoptionState,
    requested_on: String,
    accepted_on: Option<String>,
}

#[derive(Debug, Clone)]
struct UserRow {
    id: u64,
    name: String,
    surname: String,
    email: String,
    phone: String,
    address: String,
    document_type: String,
    document: String,
    password: String,
    role: String,
    photo: Option<String>,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    id: u64,
    name: &'static str,
    parent: Option<u64>,
    active: bool,
}

const fn entry(id: u64, name: &'static str, parent: Option<u64>, active: bool) -> CatalogEntry {
    CatalogEntry {
        id,
        name,
        parent,
        active,
    }
}

#[derive(Debug)]
pub struct Db {
    pets: BTreeMap<u64, PetRow>,
    vaccines: BTreeMap<u64, VaccineRow>,
    adoptions: BTreeMap<u64, AdoptionRow>,
    users: BTreeMap<u64, UserRow>,
    tokens: HashMap<String, u64>,
    /// Outstanding password reset tokens by lowercased email.
    resets: HashMap<String, String>,
    uploads: HashMap<String, Upload>,
    categories: Vec<CatalogEntry>,
    breeds: Vec<CatalogEntry>,
    departments: Vec<CatalogEntry>,
    municipalities: Vec<CatalogEntry>,
    // ids are unique across pets, vaccines, adoptions and users
    next_id: u64,
}

impl Db {
    /// Catalogs and one administrator account; no pets.
    pub fn seeded() -> Self {
        let mut db = Self {
            pets: BTreeMap::new(),
            vaccines: BTreeMap::new(),
            adoptions: BTreeMap::new(),
            users: BTreeMap::new(),
            tokens: HashMap::new(),
            resets: HashMap::new(),
            uploads: HashMap::new(),
            categories: vec![
                entry(1, "Perro", None, true),
                entry(2, "Gato", None, true),
                entry(3, "Conejo", None, false),
            ],
            breeds: vec![
                entry(1, "Criollo", Some(1), true),
                entry(2, "Labrador", Some(1), true),
                entry(3, "Siames", Some(2), true),
                entry(4, "Angora", Some(2), true),
            ],
            departments: vec![entry(1, "Huila", None, true), entry(2, "Cauca", None, true)],
            municipalities: vec![
                entry(1, "Pitalito", Some(1), true),
                entry(2, "Neiva", Some(1), true),
                entry(3, "Popayan", Some(2), true),
            ],
            next_id: 1,
        };
        let id = db.allocate_id();
        db.users.insert(
            id,
            UserRow {
                id,
                name: "Admin".to_string(),
                surname: "Adopta".to_string(),
                email: ADMIN_EMAIL.to_string(),
                phone: "3000000000".to_string(),
                address: "Calle 1".to_string(),
                document_type: "cedula".to_string(),
                document: "1000000".to_string(),
                password: ADMIN_PASSWORD.to_string(),
                role: "administrador".to_string(),
                photo: None,
            },
        );
        db
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    /// Check credentials and issue a token. Returns the token and the user.
    pub fn login(&mut self, email: &str, password: &str) -> Result<(String, Value), ServerError> {
        let user = self
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()) && u.password == password)
            .ok_or(ServerError::InvalidCredentials)?;
        let token = Uuid::new_v4().simple().to_string();
        let rendered = user_json(user);
        self.tokens.insert(token.clone(), user.id);
        Ok((token, rendered))
    }

    /// Resolve a token issued by `login` to its user id.
    pub fn authorize(&self, token: Option<&str>) -> Result<u64, ServerError> {
        token
            .and_then(|t| self.tokens.get(t))
            .copied()
            .ok_or(ServerError::Unauthorized)
    }

    pub fn email_exists(&self, email: &str) -> bool {
        self.user_by_email(email).is_some()
    }

    pub fn document_exists(&self, document: &str) -> bool {
        let document = document.trim();
        !document.is_empty() && self.users.values().any(|u| u.document == document)
    }

    fn user_by_email(&self, email: &str) -> Option<&UserRow> {
        let email = email.trim();
        self.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    pub fn register(&mut self, input: RegisterInput) -> Result<u64, ServerError> {
        if input.nombre.trim().is_empty()
            || input.correo.trim().is_empty()
            || input.password.is_empty()
        {
            return Err(ServerError::BadRequest(
                "nombre, correo and password are required".to_string(),
            ));
        }
        if self.email_exists(&input.correo) {
            return Err(ServerError::Conflict("email already registered".to_string()));
        }
        if self.document_exists(&input.documento_identidad) {
            return Err(ServerError::Conflict(
                "identity document already registered".to_string(),
            ));
        }
        let photo = input
            .img
            .map(|img| self.store_uploads(vec![img]))
            .and_then(|mut names| names.pop());
        let role = match input.rol.trim() {
            "" => "usuario".to_string(),
            role => role.to_string(),
        };
        let id = self.allocate_id();
        self.users.insert(
            id,
            UserRow {
                id,
                name: input.nombre,
                surname: input.apellido,
                email: input.correo.trim().to_string(),
                phone: input.telefono,
                address: input.direccion,
                document_type: input.tipo_documento,
                document: input.documento_identidad.trim().to_string(),
                password: input.password,
                role,
                photo,
            },
        );
        Ok(id)
    }

    /// Issue a reset token for `email`, replacing any earlier one.
    pub fn request_password_reset(&mut self, email: &str) -> Result<String, ServerError> {
        let user = self
            .user_by_email(email)
            .ok_or(ServerError::NotFound("user"))?;
        let key = user.email.to_lowercase();
        let token = Uuid::new_v4().simple().to_string();
        self.resets.insert(key, token.clone());
        Ok(token)
    }

    /// Set a new password with a token from `request_password_reset`. The
    /// token is single use.
    pub fn reset_password(
        &mut self,
        email: &str,
        token: &str,
        password: &str,
    ) -> Result<(), ServerError> {
        let key = email.trim().to_lowercase();
        if self.resets.get(&key).map(String::as_str) != Some(token) {
            return Err(ServerError::BadRequest(
                "invalid or expired reset token".to_string(),
            ));
        }
        self.set_password(&key, password)?;
        self.resets.remove(&key);
        Ok(())
    }

    /// Change the password of the signed-in `user`, who must own `email`.
    pub fn update_password(
        &mut self,
        user: u64,
        email: &str,
        password: &str,
    ) -> Result<(), ServerError> {
        let owner = self.user_by_email(email).map(|u| u.id);
        if owner != Some(user) {
            return Err(ServerError::Forbidden);
        }
        self.set_password(email, password)
    }

    fn set_password(&mut self, email: &str, password: &str) -> Result<(), ServerError> {
        if password.is_empty() {
            return Err(ServerError::BadRequest("password is required".to_string()));
        }
        let id = self
            .user_by_email(email)
            .map(|u| u.id)
            .ok_or(ServerError::NotFound("user"))?;
        if let Some(row) = self.users.get_mut(&id) {
            row.password = password.to_string();
        }
        Ok(())
    }

    /// Update names and email of the signed-in `user`, addressed by document.
    pub fn update_profile(
        &mut self,
        user: u64,
        document: &str,
        input: ProfileInput,
    ) -> Result<Value, ServerError> {
        let row = self.users.get(&user).ok_or(ServerError::NotFound("user"))?;
        if row.document != document.trim() {
            return Err(ServerError::Forbidden);
        }
        if self
            .user_by_email(&input.correo)
            .is_some_and(|other| other.id != user)
        {
            return Err(ServerError::Conflict("email already registered".to_string()));
        }
        let row = self.users.get_mut(&user).ok_or(ServerError::NotFound("user"))?;
        row.name = input.nombres;
        row.surname = input.apellidos;
        row.email = input.correo.trim().to_string();
        Ok(user_json(row))
    }

    pub fn profile(&self, user: u64) -> Result<Value, ServerError> {
        self.users
            .get(&user)
            .map(user_json)
            .ok_or(ServerError::NotFound("user"))
    }

    // -----------------------------------------------------------------------
    // Pets
    // -----------------------------------------------------------------------

    pub fn list_pets(&self) -> Vec<Value> {
        self.pets.values().map(|p| self.pet_json(p)).collect()
    }

    pub fn get_pet(&self, id: u64) -> Result<Value, ServerError> {
        self.pets
            .get(&id)
            .map(|p| self.pet_json(p))
            .ok_or(ServerError::NotFound("pet"))
    }

    pub fn create_pet(&mut self, input: PetInput) -> Result<u64, ServerError> {
        let missing: Vec<&str> = PET_FIELDS
            .iter()
            .copied()
            .filter(|f| input.field(f).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ServerError::BadRequest(format!(
                "missing fields: {}",
                missing.join(", ")
            )));
        }
        if input.uploads.is_empty() {
            return Err(ServerError::BadRequest("imagenes is required".to_string()));
        }
        let fields = PET_FIELDS
            .iter()
            .filter_map(|f| input.field(f).map(|v| (f.to_string(), v.to_string())))
            .collect();
        let images = self.store_uploads(input.uploads);
        let id = self.allocate_id();
        self.pets.insert(id, PetRow { id, fields, images });
        Ok(id)
    }

    /// Overwrite the fields present in `input`; images become the retained
    /// ones followed by the new uploads.
    pub fn update_pet(&mut self, id: u64, input: PetInput) -> Result<(), ServerError> {
        let current = self.pets.get(&id).ok_or(ServerError::NotFound("pet"))?;
        let mut images: Vec<String> = input
            .retained
            .iter()
            .filter(|name| current.images.contains(name))
            .cloned()
            .collect();
        if images.is_empty() && input.uploads.is_empty() {
            return Err(ServerError::BadRequest("imagenes is required".to_string()));
        }
        let dropped: Vec<String> = current
            .images
            .iter()
            .filter(|name| !images.contains(name))
            .cloned()
            .collect();
        for name in dropped {
            self.uploads.remove(&name);
        }
        let changed: Vec<(String, String)> = PET_FIELDS
            .iter()
            .filter_map(|f| input.field(f).map(|v| (f.to_string(), v.to_string())))
            .collect();
        images.extend(self.store_uploads(input.uploads));

        let pet = self.pets.get_mut(&id).ok_or(ServerError::NotFound("pet"))?;
        pet.fields.extend(changed);
        pet.images = images;
        Ok(())
    }

    /// Remove a pet together with its vaccines and adoption requests.
    pub fn delete_pet(&mut self, id: u64) -> Result<(), ServerError> {
        let pet = self.pets.remove(&id).ok_or(ServerError::NotFound("pet"))?;
        for name in &pet.images {
            self.uploads.remove(name);
        }
        self.vaccines.retain(|_, v| v.pet_id != id);
        self.adoptions.retain(|_, a| a.pet_id != id);
        Ok(())
    }

    fn store_uploads(&mut self, uploads: Vec<NewUpload>) -> Vec<String> {
        uploads
            .into_iter()
            .map(|upload| {
                let name = format!(
                    "{}-{}",
                    Uuid::new_v4().simple(),
                    sanitize_filename(&upload.filename)
                );
                self.uploads.insert(
                    name.clone(),
                    Upload {
                        content_type: upload.content_type,
                        bytes: upload.bytes,
                    },
                );
                name
            })
            .collect()
    }

    pub fn upload(&self, name: &str) -> Option<&Upload> {
        self.uploads.get(name)
    }

    fn pet_json(&self, pet: &PetRow) -> Value {
        json!({
            "id_mascota": pet.id,
            "nombre_mascota": pet.get("nombre_mascota"),
            "fecha_nacimiento": pet.get("fecha_nacimiento"),
            "estado": pet.status(),
            "descripcion": pet.get("descripcion"),
            "esterilizado": pet.get("esterilizado"),
            "tamano": pet.get("tamano"),
            "peso": pet.get("peso"),
            "fk_id_categoria": pet.fk("fk_id_categoria"),
            "categoria": catalog_name(&self.categories, pet.fk("fk_id_categoria")),
            "fk_id_raza": pet.fk("fk_id_raza"),
            "raza": catalog_name(&self.breeds, pet.fk("fk_id_raza")),
            "departamento": catalog_name(&self.departments, pet.fk("fk_id_departamento")),
            "municipio": catalog_name(&self.municipalities, pet.fk("fk_id_municipio")),
            "sexo": pet.get("sexo"),
            "imagenes": pet.images.join(","),
        })
    }

    // -----------------------------------------------------------------------
    // Vaccines
    // -----------------------------------------------------------------------

    pub fn list_vaccines(&self, pet: Option<u64>) -> Vec<Value> {
        self.vaccines
            .values()
            .filter(|v| pet.is_none_or(|p| v.pet_id == p))
            .map(|v| self.vaccine_json(v))
            .collect()
    }

    pub fn get_vaccine(&self, id: u64) -> Result<Value, ServerError> {
        self.vaccines
            .get(&id)
            .map(|v| self.vaccine_json(v))
            .ok_or(ServerError::NotFound("vaccine"))
    }

    pub fn create_vaccine(&mut self, input: VaccineInput) -> Result<u64, ServerError> {
        let pet_id = input.fk_id_mascota.value("fk_id_mascota")?;
        if !self.pets.contains_key(&pet_id) {
            return Err(ServerError::NotFound("pet"));
        }
        if input.enfermedad.trim().is_empty() {
            return Err(ServerError::BadRequest("enfermedad is required".to_string()));
        }
        let id = self.allocate_id();
        self.vaccines.insert(
            id,
            VaccineRow {
                id,
                pet_id,
                date: input.fecha_vacuna,
                disease: input.enfermedad,
                status: input.estado,
            },
        );
        Ok(id)
    }

    fn vaccine_json(&self, vaccine: &VaccineRow) -> Value {
        let pet_name = self
            .pets
            .get(&vaccine.pet_id)
            .map(|p| p.get("nombre_mascota"))
            .unwrap_or_default();
        json!({
            "id_vacuna": vaccine.id,
            "fk_id_mascota": vaccine.pet_id,
            "nombre_mascota": pet_name,
            "fecha_vacuna": vaccine.date,
            "enfermedad": vaccine.disease,
            "estado": vaccine.status,
        })
    }

    // -----------------------------------------------------------------------
    // Adoptions
    // -----------------------------------------------------------------------

    /// Open an adoption request; the pet becomes `Reservado`.
    pub fn start_adoption(&mut self, pet_id: u64, user_id: u64, today: &str) -> Result<u64, ServerError> {
        if !self.users.contains_key(&user_id) {
            return Err(ServerError::BadRequest(format!("unknown user {user_id}")));
        }
        let pet = self.pets.get_mut(&pet_id).ok_or(ServerError::NotFound("pet"))?;
        if !ADOPTABLE.contains(&pet.status()) {
            return Err(ServerError::Conflict(
                "pet is not available for adoption".to_string(),
            ));
        }
        pet.fields.insert("estado".to_string(), "Reservado".to_string());
        let id = self.allocate_id();
        self.adoptions.insert(
            id,
            AdoptionRow {
                id,
                pet_id,
                user_id,
                state: AdoptionState::InProcess,
                requested_on: today.to_string(),
                accepted_on: None,
            },
        );
        Ok(id)
    }

    /// Accept (`aceptar`) or deny (`denegar`) a request in process.
    pub fn administer_adoption(
        &mut self,
        id: u64,
        action: &str,
        today: &str,
    ) -> Result<AdoptionState, ServerError> {
        let (state, pet_status) = match action {
            "aceptar" => (AdoptionState::Accepted, "Adoptado"),
            "denegar" => (AdoptionState::Denied, "En Adopcion"),
            other => {
                return Err(ServerError::BadRequest(format!("unknown action {other}")));
            }
        };
        let adoption = self
            .adoptions
            .get_mut(&id)
            .ok_or(ServerError::NotFound("adoption"))?;
        if adoption.state != AdoptionState::InProcess {
            return Err(ServerError::Conflict(format!(
                "adoption is already {}",
                adoption.state.as_str()
            )));
        }
        adoption.state = state;
        if state == AdoptionState::Accepted {
            adoption.accepted_on = Some(today.to_string());
        }
        if let Some(pet) = self.pets.get_mut(&adoption.pet_id) {
            pet.fields
                .insert("estado".to_string(), pet_status.to_string());
        }
        Ok(state)
    }

    pub fn list_adoptions(&self, user: u64, state: AdoptionState) -> Vec<Value> {
        self.adoptions
            .values()
            .filter(|a| a.user_id == user && a.state == state)
            .filter_map(|a| {
                let pet = self.pets.get(&a.pet_id)?;
                let mut record = self.pet_json(pet);
                if let Value::Object(map) = &mut record {
                    map.insert("id_adopcion".to_string(), json!(a.id));
                    map.insert("fk_id_mascota".to_string(), json!(a.pet_id));
                    map.insert("fk_id_usuario_adoptante".to_string(), json!(a.user_id));
                    map.insert("estado_adopcion".to_string(), json!(a.state.as_str()));
                    map.insert("fecha_adopcion_proceso".to_string(), json!(a.requested_on));
                    if let Some(accepted) = &a.accepted_on {
                        map.insert("fecha_adopcion_aceptada".to_string(), json!(accepted));
                    }
                }
                Some(record)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Catalogs
    // -----------------------------------------------------------------------

    pub fn list_categories(&self) -> Vec<Value> {
        self.categories
            .iter()
            .map(|c| {
                json!({
                    "id_categoria": c.id,
                    "nombre_categoria": c.name,
                    "estado": if c.active { "activa" } else { "inactiva" },
                })
            })
            .collect()
    }

    pub fn list_breeds(&self, category: u64) -> Vec<Value> {
        self.breeds
            .iter()
            .filter(|b| b.parent == Some(category))
            .map(|b| json!({ "id_raza": b.id, "nombre_raza": b.name, "fk_id_categoria": category }))
            .collect()
    }

    pub fn list_departments(&self) -> Vec<Value> {
        self.departments
            .iter()
            .map(|d| json!({ "id_departamento": d.id, "nombre_departamento": d.name }))
            .collect()
    }

    pub fn list_municipalities(&self, department: u64) -> Vec<Value> {
        self.municipalities
            .iter()
            .filter(|m| m.parent == Some(department))
            .map(|m| {
                json!({
                    "id_municipio": m.id,
                    "nombre_municipio": m.name,
                    "fk_id_departamento": department,
                })
            })
            .collect()
    }
}

fn user_json(user: &UserRow) -> Value {
    json!({
        "id_usuario": user.id,
        "nombre": user.name,
        "apellido": user.surname,
        "correo": user.email,
        "telefono": user.phone,
        "direccion": user.address,
        "tipo_documento": user.document_type,
        "documento_identidad": user.document,
        "rol": user.role,
        "img": user.photo,
    })
}

fn catalog_name(entries: &[CatalogEntry], id: Option<u64>) -> &'static str {
    id.and_then(|id| entries.iter().find(|e| e.id == id))
        .map(|e| e.name)
        .unwrap_or_default()
}

/// Keep filenames safe for a URL path and for the comma-joined image list.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}
