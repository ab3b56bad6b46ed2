//! Normalisation of backend records into canonical types.
//!
//! # Design
//! The backend answers with loosely typed JSON: ids arrive as numbers or
//! strings, the same field goes by two names depending on the endpoint, and
//! a record may carry both a foreign key and a display name for a relation.
//! Deserializing into strict structs with serde aliases fails on such
//! duplicates, so each record is read as a JSON object and fields are picked
//! by an ordered list of candidate keys.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::images::split_images;
use crate::session::Session;
use crate::types::{
    AdoptionRequest, AdoptionStage, Breed, Category, Department, Municipality, Pet, PetStatus,
    ResetRequested, Role, User, Vaccine, VaccineStatus,
};

/// A backend JSON object with lenient field accessors.
pub(crate) struct Record<'a> {
    kind: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> Record<'a> {
    pub(crate) fn new(kind: &'static str, value: &'a Value) -> Result<Self, ApiError> {
        match value.as_object() {
            Some(map) => Ok(Self { kind, map }),
            None => Err(ApiError::Deserialization(format!(
                "{kind}: expected a JSON object"
            ))),
        }
    }

    fn first(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|k| self.map.get(*k))
            .find(|v| !v.is_null())
    }

    pub(crate) fn id(&self, keys: &[&str]) -> Result<u64, ApiError> {
        self.opt_id(keys).ok_or_else(|| {
            ApiError::Deserialization(format!("{}: missing id field {}", self.kind, keys[0]))
        })
    }

    pub(crate) fn opt_id(&self, keys: &[&str]) -> Option<u64> {
        match self.first(keys)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub(crate) fn opt_text(&self, keys: &[&str]) -> Option<String> {
        match self.first(keys)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub(crate) fn text(&self, keys: &[&str]) -> String {
        self.opt_text(keys).unwrap_or_default()
    }

    fn opt_f64(&self, keys: &[&str]) -> Option<f64> {
        match self.first(keys)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn opt_bool(&self, keys: &[&str]) -> Option<bool> {
        match self.first(keys)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_u64().map(|n| n != 0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "si" | "sí" | "true" | "1" => Some(true),
                "no" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn opt_date(&self, keys: &[&str]) -> Option<NaiveDate> {
        self.opt_text(keys).and_then(|raw| parse_date(&raw))
    }
}

/// Accepts `YYYY-MM-DD` optionally followed by a time part.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub(crate) fn pet(value: &Value) -> Result<Pet, ApiError> {
    let r = Record::new("pet", value)?;
    Ok(Pet {
        id: r.id(&["id_mascota", "fk_id_mascota", "id"])?,
        name: r.text(&["nombre_mascota", "nombre"]),
        breed: r.text(&["raza", "nombre_raza", "fk_id_raza"]),
        category: r.text(&["categoria", "nombre_categoria", "fk_id_categoria"]),
        sex: r.text(&["sexo", "genero"]),
        birth_date: r.opt_date(&["fecha_nacimiento"]),
        weight: r.opt_f64(&["peso"]),
        sterilized: r.opt_bool(&["esterilizado", "esterilizacion"]),
        size: r.opt_text(&["tamano"]),
        description: r.text(&["descripcion"]),
        status: PetStatus::parse(&r.text(&["estado"])),
        images: r
            .opt_text(&["imagenes"])
            .map(|raw| split_images(&raw))
            .unwrap_or_default(),
        department: r.opt_text(&["departamento", "nombre_departamento"]),
        municipality: r.opt_text(&["municipio", "nombre_municipio"]),
    })
}

pub(crate) fn vaccine(value: &Value) -> Result<Vaccine, ApiError> {
    let r = Record::new("vaccine", value)?;
    Ok(Vaccine {
        id: r.id(&["id_vacuna", "id"])?,
        pet_id: r.opt_id(&["fk_id_mascota", "id_mascota"]).unwrap_or_default(),
        disease: r.text(&["enfermedad"]),
        administered_on: r.opt_date(&["fecha_vacuna"]),
        status: VaccineStatus::parse(&r.text(&["estado"])),
    })
}

pub(crate) fn adoption(value: &Value, stage: AdoptionStage) -> Result<AdoptionRequest, ApiError> {
    let r = Record::new("adoption", value)?;
    Ok(AdoptionRequest {
        id: r.id(&["id_adopcion", "id"])?,
        pet: pet(value)?,
        user_id: r.opt_id(&["fk_id_usuario_adoptante", "id_usuario", "fk_id_usuario"]),
        requested_at: r.opt_text(&[
            "fecha_adopcion_proceso",
            "fecha_adopcion_aceptada",
            "fecha_adopcion",
        ]),
        stage,
    })
}

pub(crate) fn user(value: &Value) -> Result<User, ApiError> {
    let r = Record::new("user", value)?;
    Ok(User {
        id: r.id(&["id_usuario", "id"])?,
        name: r.text(&["nombre"]),
        surname: r.opt_text(&["apellido"]),
        email: r.opt_text(&["correo"]),
        phone: r.opt_text(&["telefono"]),
        document: r.opt_text(&["documento_identidad", "identificacion"]),
        role: Role::parse(&r.text(&["rol"])),
    })
}

pub(crate) fn category(value: &Value) -> Result<Category, ApiError> {
    let r = Record::new("category", value)?;
    Ok(Category {
        id: r.id(&["id_categoria", "id"])?,
        name: r.text(&["nombre_categoria", "nombre"]),
        active: r.text(&["estado"]) == "activa",
    })
}

pub(crate) fn breed(value: &Value) -> Result<Breed, ApiError> {
    let r = Record::new("breed", value)?;
    Ok(Breed {
        id: r.id(&["id_raza", "id"])?,
        name: r.text(&["nombre_raza", "nombre"]),
        category_id: r.opt_id(&["fk_id_categoria"]),
    })
}

pub(crate) fn department(value: &Value) -> Result<Department, ApiError> {
    let r = Record::new("department", value)?;
    Ok(Department {
        id: r.id(&["id_departamento", "id"])?,
        name: r.text(&["nombre_departamento", "nombre"]),
    })
}

pub(crate) fn municipality(value: &Value) -> Result<Municipality, ApiError> {
    let r = Record::new("municipality", value)?;
    Ok(Municipality {
        id: r.id(&["id_municipio", "id"])?,
        name: r.text(&["nombre_municipio", "nombre"]),
        department_id: r.opt_id(&["fk_id_departamento"]),
    })
}

/// Build a session from the login response.
///
/// `user` may be an object or a one-element array.
pub(crate) fn login(value: &Value) -> Result<Session, ApiError> {
    let r = Record::new("login", value)?;
    let token = r
        .opt_text(&["token"])
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Deserialization("login: missing token".to_string()))?;
    let user_value = match value.get("user") {
        Some(Value::Array(items)) => items.first(),
        Some(other) => Some(other),
        None => None,
    }
    .ok_or_else(|| ApiError::Deserialization("login: missing user".to_string()))?;
    Ok(Session::authenticated(token, user(user_value)?))
}

/// Read the `existe` flag of an availability check.
pub(crate) fn exists(body: &str) -> Result<bool, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    Record::new("availability", &value)?
        .opt_bool(&["existe", "exists"])
        .ok_or_else(|| ApiError::Deserialization("availability: missing existe".to_string()))
}

pub(crate) fn reset_requested(body: &str) -> ResetRequested {
    let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    ResetRequested {
        message: message(body),
        token: value
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    }
}

/// Some replies repeat a status code inside a 200 body.
pub(crate) fn embedded_status(body: &str) -> Option<u16> {
    let value: Value = serde_json::from_str(body).ok()?;
    let status = value.get("status")?;
    status
        .as_u64()
        .or_else(|| status.as_str().and_then(|s| s.trim().parse().ok()))
        .and_then(|s| u16::try_from(s).ok())
}

/// Apply `convert` to every element of a JSON array body.
pub(crate) fn list<T>(
    body: &str,
    convert: impl Fn(&Value) -> Result<T, ApiError>,
) -> Result<Vec<T>, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    match value {
        Value::Array(items) => items.iter().map(convert).collect(),
        _ => Err(ApiError::Deserialization(
            "expected a JSON array".to_string(),
        )),
    }
}

/// Parse a single-object body. Some endpoints wrap the record in an array.
pub(crate) fn one<T>(
    body: &str,
    convert: impl Fn(&Value) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    match &value {
        Value::Array(items) => match items.first() {
            Some(first) => convert(first),
            None => Err(ApiError::NotFound),
        },
        other => convert(other),
    }
}

/// Human-readable message of a backend reply, if the body carries one.
pub(crate) fn message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "mensaje", "error"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}
