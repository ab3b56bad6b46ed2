//! Canonical domain types for the adoption marketplace.
//!
//! # Design
//! The backend serves the same entities under drifting field names
//! (`nombre_mascota` vs `nombre`, `sexo` vs `genero`). Those names stop at
//! `adapter`; everything in this module uses one English schema.
//!
//! Status values keep the backend's exact text because the status filter
//! compares on it, case-sensitively. Values outside the canonical set are
//! kept verbatim in `Unrecognized` rather than guessed into a known variant.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::http::FilePart;

pub type PetId = u64;
pub type UserId = u64;
pub type VaccineId = u64;
pub type AdoptionId = u64;

/// Adoption state of a pet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PetStatus {
    EnAdopcion,
    Urgente,
    Reservado,
    Adoptado,
    Unrecognized(String),
}

impl PetStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "En Adopcion" | "EnAdopcion" => PetStatus::EnAdopcion,
            "Urgente" => PetStatus::Urgente,
            "Reservado" => PetStatus::Reservado,
            "Adoptado" => PetStatus::Adoptado,
            other => PetStatus::Unrecognized(other.to_string()),
        }
    }

    /// Wire text of the status.
    pub fn as_str(&self) -> &str {
        match self {
            PetStatus::EnAdopcion => "En Adopcion",
            PetStatus::Urgente => "Urgente",
            PetStatus::Reservado => "Reservado",
            PetStatus::Adoptado => "Adoptado",
            PetStatus::Unrecognized(raw) => raw,
        }
    }

    /// Whether a user may start an adoption for a pet in this state.
    pub fn is_adoptable(&self) -> bool {
        matches!(self, PetStatus::EnAdopcion | PetStatus::Urgente)
    }
}

impl From<String> for PetStatus {
    fn from(raw: String) -> Self {
        PetStatus::parse(&raw)
    }
}

impl From<PetStatus> for String {
    fn from(status: PetStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pet as shown by the listing screens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pet {
    pub id: PetId,
    pub name: String,
    pub breed: String,
    pub category: String,
    pub sex: String,
    pub birth_date: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub sterilized: Option<bool>,
    pub size: Option<String>,
    pub description: String,
    pub status: PetStatus,
    /// Image filenames; the first one is the main image.
    pub images: Vec<String>,
    pub department: Option<String>,
    pub municipality: Option<String>,
}

impl Pet {
    pub fn main_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VaccineStatus {
    Completa,
    Incompleta,
    EnProceso,
    NoSe,
    Unrecognized(String),
}

impl VaccineStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Completa" => VaccineStatus::Completa,
            "Incompleta" => VaccineStatus::Incompleta,
            "En Proceso" => VaccineStatus::EnProceso,
            "no se" => VaccineStatus::NoSe,
            other => VaccineStatus::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VaccineStatus::Completa => "Completa",
            VaccineStatus::Incompleta => "Incompleta",
            VaccineStatus::EnProceso => "En Proceso",
            VaccineStatus::NoSe => "no se",
            VaccineStatus::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for VaccineStatus {
    fn from(raw: String) -> Self {
        VaccineStatus::parse(&raw)
    }
}

impl From<VaccineStatus> for String {
    fn from(status: VaccineStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vaccine {
    pub id: VaccineId,
    pub pet_id: PetId,
    pub disease: String,
    pub administered_on: Option<NaiveDate>,
    pub status: VaccineStatus,
}

/// Where an adoption request sits in its lifecycle.
///
/// Not sent by the backend; inferred from the endpoint that listed it.
/// Denied requests are never listed, so they have no stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdoptionStage {
    InProcess,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdoptionRequest {
    pub id: AdoptionId,
    pub pet: Pet,
    pub user_id: Option<UserId>,
    pub requested_at: Option<String>,
    pub stage: AdoptionStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Usuario,
    Administrador,
    Superusuario,
    Invitado,
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "administrador" => Role::Administrador,
            "superusuario" => Role::Superusuario,
            "usuario" => Role::Usuario,
            _ => Role::Invitado,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Administrador | Role::Superusuario)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breed {
    pub id: u64,
    pub name: String,
    pub category_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Department {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Municipality {
    pub id: u64,
    pub name: String,
    pub department_id: Option<u64>,
}

/// Result of a mutation the backend acknowledged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub message: Option<String>,
}

/// Decision an administrator takes on an adoption request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdoptionAction {
    Accept,
    Deny,
}

impl AdoptionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdoptionAction::Accept => "aceptar",
            AdoptionAction::Deny => "denegar",
        }
    }
}

/// An image slot in the pet form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PetImage {
    /// A freshly picked file to upload.
    New(FilePart),
    /// An image already stored on the server, kept as-is.
    Existing(String),
}

/// Pet create/update form as entered by an administrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetForm {
    pub name: String,
    /// `YYYY-MM-DD`.
    pub birth_date: String,
    pub status: String,
    pub description: String,
    pub sterilized: String,
    pub size: String,
    pub weight: String,
    pub category_id: String,
    pub breed_id: String,
    pub department_id: String,
    pub municipality_id: String,
    pub sex: String,
    pub images: Vec<PetImage>,
}

/// Vaccine registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaccineForm {
    #[serde(rename = "fk_id_mascota")]
    pub pet_id: String,
    #[serde(rename = "fecha_vacuna")]
    pub date: String,
    #[serde(rename = "enfermedad")]
    pub disease: String,
    #[serde(rename = "estado")]
    pub status: String,
}

/// Account registration form, sent as multipart with an optional photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUser {
    pub name: String,
    pub surname: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub document_type: String,
    pub document: String,
    pub password: String,
    pub role: String,
    pub photo: Option<FilePart>,
}

impl Default for RegisterUser {
    fn default() -> Self {
        Self {
            name: String::new(),
            surname: String::new(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            document_type: String::new(),
            document: String::new(),
            password: String::new(),
            role: "usuario".to_string(),
            photo: None,
        }
    }
}

/// Short visitor sign-up used from the guest flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestRegistration {
    pub document: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// Reply to a password reset request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetRequested {
    pub message: Option<String>,
    /// Handed to `PasswordReset::token`.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PasswordReset {
    #[serde(rename = "correo")]
    pub email: String,
    pub token: String,
    pub password: String,
}

/// New password for the signed-in account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PasswordChange {
    #[serde(rename = "correo")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(rename = "nombres")]
    pub name: String,
    #[serde(rename = "apellidos")]
    pub surname: String,
    #[serde(rename = "correo")]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Credentials {
    #[serde(rename = "correo")]
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pet_status_accepts_both_spellings_of_en_adopcion() {
        assert_eq!(PetStatus::parse("En Adopcion"), PetStatus::EnAdopcion);
        assert_eq!(PetStatus::parse("EnAdopcion"), PetStatus::EnAdopcion);
        assert_eq!(PetStatus::EnAdopcion.as_str(), "En Adopcion");
    }

    #[test]
    fn legacy_status_is_kept_verbatim() {
        let status = PetStatus::parse("proceso adopcion");
        assert_eq!(status, PetStatus::Unrecognized("proceso adopcion".to_string()));
        assert_eq!(status.as_str(), "proceso adopcion");
        assert!(!status.is_adoptable());
    }

    #[test]
    fn status_parse_is_case_sensitive() {
        assert!(matches!(PetStatus::parse("urgente"), PetStatus::Unrecognized(_)));
    }

    #[test]
    fn pet_status_serializes_as_wire_text() {
        let json = serde_json::to_string(&PetStatus::EnAdopcion).unwrap();
        assert_eq!(json, "\"En Adopcion\"");
        let back: PetStatus = serde_json::from_str("\"Reservado\"").unwrap();
        assert_eq!(back, PetStatus::Reservado);
    }

    #[test]
    fn vaccine_form_uses_wire_names() {
        let form = VaccineForm {
            pet_id: "3".to_string(),
            date: "2024-05-01".to_string(),
            disease: "Rabia".to_string(),
            status: "Completa".to_string(),
        };
        let body = serde_json::to_value(&form).unwrap();
        assert_eq!(body["fk_id_mascota"], "3");
        assert_eq!(body["enfermedad"], "Rabia");
    }

    #[test]
    fn unknown_role_is_guest() {
        assert_eq!(Role::parse("invitado"), Role::Invitado);
        assert_eq!(Role::parse(""), Role::Invitado);
        assert!(Role::parse("superusuario").is_admin());
    }
}
