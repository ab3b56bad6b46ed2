//! Client-side form validation.
//!
//! Each `validate_*` collects every failing field rather than stopping at
//! the first, so a form can flag all of them at once. Dates are checked
//! against a caller-supplied `today` to keep the checks deterministic.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ApiError, ValidationErrors};
use crate::types::{
    Credentials, GuestRegistration, PasswordChange, PasswordReset, PetForm, ProfileUpdate,
    RegisterUser, VaccineForm,
};

pub const MAX_DESCRIPTION_CHARS: usize = 300;
pub const MAX_WEIGHT_KG: u32 = 200;

static PERSON_OR_PET_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-ZñÑáéíóúÁÉÍÓÚ\s]{1,20}$").expect("static regex"));
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("static regex"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));

fn required(errors: &mut ValidationErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(field, "is required");
        false
    } else {
        true
    }
}

fn name_like(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if required(errors, field, value) && !PERSON_OR_PET_NAME.is_match(value) {
        errors.push(field, "must be at most 20 letters and spaces");
    }
}

fn past_date(errors: &mut ValidationErrors, field: &'static str, value: &str, today: NaiveDate) {
    if !required(errors, field, value) {
        return;
    }
    if !ISO_DATE.is_match(value) {
        errors.push(field, "must use the YYYY-MM-DD format");
        return;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) if date > today => errors.push(field, "cannot be in the future"),
        Ok(_) => {}
        Err(_) => errors.push(field, "is not a valid date"),
    }
}

pub fn validate_pet_form(form: &PetForm, today: NaiveDate) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();

    name_like(&mut errors, "nombre_mascota", &form.name);
    past_date(&mut errors, "fecha_nacimiento", &form.birth_date, today);
    required(&mut errors, "estado", &form.status);
    if required(&mut errors, "descripcion", &form.description)
        && form.description.chars().count() > MAX_DESCRIPTION_CHARS
    {
        errors.push("descripcion", "must be at most 300 characters");
    }
    required(&mut errors, "esterilizado", &form.sterilized);
    required(&mut errors, "tamano", &form.size);
    if required(&mut errors, "peso", &form.weight) {
        if !DIGITS.is_match(&form.weight) {
            errors.push("peso", "must be a whole number of kilograms");
        } else if form.weight.parse::<u32>().map_or(true, |kg| kg > MAX_WEIGHT_KG) {
            errors.push("peso", "cannot exceed 200");
        }
    }
    required(&mut errors, "fk_id_categoria", &form.category_id);
    required(&mut errors, "fk_id_raza", &form.breed_id);
    required(&mut errors, "fk_id_departamento", &form.department_id);
    required(&mut errors, "fk_id_municipio", &form.municipality_id);
    required(&mut errors, "sexo", &form.sex);
    if form.images.is_empty() {
        errors.push("imagenes", "select at least one image");
    }

    errors.into_result()
}

pub fn validate_vaccine_form(form: &VaccineForm, today: NaiveDate) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();
    required(&mut errors, "fk_id_mascota", &form.pet_id);
    past_date(&mut errors, "fecha_vacuna", &form.date, today);
    name_like(&mut errors, "enfermedad", &form.disease);
    required(&mut errors, "estado", &form.status);
    errors.into_result()
}

fn email(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if required(errors, field, value) && !EMAIL.is_match(value) {
        errors.push(field, "is not a valid email address");
    }
}

fn phone(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if required(errors, field, value) && !(DIGITS.is_match(value) && value.len() == 10) {
        errors.push(field, "must be exactly 10 digits");
    }
}

fn document(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if required(errors, field, value)
        && !(DIGITS.is_match(value) && (6..=10).contains(&value.len()))
    {
        errors.push(field, "must be 6 to 10 digits");
    }
}

fn password(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    let len = value.chars().count();
    if required(errors, field, value) && !(8..=16).contains(&len) {
        errors.push(field, "must be 8 to 16 characters");
    }
}

pub fn validate_registration(form: &RegisterUser) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();
    name_like(&mut errors, "nombre", &form.name);
    name_like(&mut errors, "apellido", &form.surname);
    required(&mut errors, "direccion", &form.address);
    email(&mut errors, "correo", &form.email);
    phone(&mut errors, "telefono", &form.phone);
    required(&mut errors, "tipo_documento", &form.document_type);
    document(&mut errors, "documento_identidad", &form.document);
    password(&mut errors, "password", &form.password);
    required(&mut errors, "rol", &form.role);
    if let Some(photo) = &form.photo {
        if !photo.content_type.starts_with("image/") {
            errors.push("img", "must be an image");
        }
    }
    errors.into_result()
}

pub fn validate_guest_registration(form: &GuestRegistration) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();
    document(&mut errors, "identificacion", &form.document);
    name_like(&mut errors, "nombre", &form.name);
    name_like(&mut errors, "apellido", &form.surname);
    email(&mut errors, "correo", &form.email);
    password(&mut errors, "password", &form.password);
    phone(&mut errors, "telefono", &form.phone);
    errors.into_result()
}

/// Address used to look up an account before registering or resetting.
pub fn validate_email(value: &str) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();
    email(&mut errors, "correo", value);
    errors.into_result()
}

pub fn validate_document(value: &str) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();
    document(&mut errors, "documento_identidad", value);
    errors.into_result()
}

pub fn validate_password_reset(form: &PasswordReset) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();
    email(&mut errors, "correo", &form.email);
    required(&mut errors, "token", &form.token);
    password(&mut errors, "password", &form.password);
    errors.into_result()
}

pub fn validate_password_change(form: &PasswordChange) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();
    email(&mut errors, "correo", &form.email);
    password(&mut errors, "password", &form.password);
    errors.into_result()
}

pub fn validate_profile_update(form: &ProfileUpdate) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();
    name_like(&mut errors, "nombres", &form.name);
    name_like(&mut errors, "apellidos", &form.surname);
    email(&mut errors, "correo", &form.email);
    errors.into_result()
}

pub fn validate_credentials(credentials: &Credentials) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();
    required(&mut errors, "correo", &credentials.email);
    required(&mut errors, "password", &credentials.password);
    errors.into_result()
}
