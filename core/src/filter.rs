//! Derivation of the displayed subset of a listing.
//!
//! A listing shows the snapshot narrowed in three stages: the screen's fixed
//! exclusion rule, a case-insensitive substring query over the screen's
//! search fields, and an exact status match. Order is preserved and the
//! snapshot is only borrowed.

use crate::types::{AdoptionRequest, Pet, Vaccine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Breed,
    Category,
    Sex,
}

/// An item a listing can filter.
pub trait Filterable {
    /// Exact status text compared by the status filter.
    fn status_key(&self) -> &str;

    fn search_field(&self, field: SearchField) -> &str;
}

impl Filterable for Pet {
    fn status_key(&self) -> &str {
        self.status.as_str()
    }

    fn search_field(&self, field: SearchField) -> &str {
        match field {
            SearchField::Name => &self.name,
            SearchField::Breed => &self.breed,
            SearchField::Category => &self.category,
            SearchField::Sex => &self.sex,
        }
    }
}

impl Filterable for AdoptionRequest {
    fn status_key(&self) -> &str {
        self.pet.status_key()
    }

    fn search_field(&self, field: SearchField) -> &str {
        self.pet.search_field(field)
    }
}

impl Filterable for Vaccine {
    fn status_key(&self) -> &str {
        self.status.as_str()
    }

    fn search_field(&self, field: SearchField) -> &str {
        match field {
            SearchField::Name => &self.disease,
            _ => "",
        }
    }
}

/// Status selection; `All` disables the status stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(String),
}

impl StatusFilter {
    /// Label the pickers use for "no status filter".
    pub const ALL_KEY: &'static str = "Todos";

    /// Map a picker key to a filter. `Todos`, `todos` and the empty key mean all.
    pub fn from_key(key: &str) -> Self {
        match key {
            "" | "Todos" | "todos" => StatusFilter::All,
            other => StatusFilter::Only(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub query: String,
    pub status: StatusFilter,
}

impl FilterCriteria {
    pub fn new(query: &str, status_key: &str) -> Self {
        Self {
            query: query.to_string(),
            status: StatusFilter::from_key(status_key),
        }
    }
}

/// Per-screen filtering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingProfile {
    /// Statuses never shown, whatever the criteria.
    pub excluded: &'static [&'static str],
    pub fields: &'static [SearchField],
}

impl ListingProfile {
    /// Public catalogue: reserved and adopted pets are hidden.
    pub const PUBLIC_PETS: ListingProfile = ListingProfile {
        excluded: &["Reservado", "Adoptado"],
        fields: &[
            SearchField::Name,
            SearchField::Breed,
            SearchField::Category,
            SearchField::Sex,
        ],
    };

    pub const ADMIN_PETS: ListingProfile = ListingProfile {
        excluded: &[],
        fields: &[SearchField::Name, SearchField::Breed],
    };

    pub const PENDING_ADOPTIONS: ListingProfile = ListingProfile {
        excluded: &[],
        fields: &[SearchField::Name, SearchField::Breed, SearchField::Sex],
    };

    pub const ACCEPTED_ADOPTIONS: ListingProfile = ListingProfile {
        excluded: &[],
        fields: &[SearchField::Name, SearchField::Breed, SearchField::Sex],
    };

    pub const VACCINES: ListingProfile = ListingProfile {
        excluded: &[],
        fields: &[SearchField::Name],
    };

    pub fn is_excluded<T: Filterable>(&self, item: &T) -> bool {
        self.excluded.contains(&item.status_key())
    }
}

/// Whether `item` survives all three stages.
pub fn matches<T: Filterable>(item: &T, profile: &ListingProfile, criteria: &FilterCriteria) -> bool {
    if profile.is_excluded(item) {
        return false;
    }
    if !criteria.query.is_empty() {
        let needle = criteria.query.to_lowercase();
        let hit = profile
            .fields
            .iter()
            .any(|f| item.search_field(*f).to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    match &criteria.status {
        StatusFilter::All => true,
        StatusFilter::Only(key) => item.status_key() == key,
    }
}

pub fn apply<'a, T: Filterable>(
    snapshot: &'a [T],
    profile: &ListingProfile,
    criteria: &FilterCriteria,
) -> Vec<&'a T> {
    snapshot
        .iter()
        .filter(|item| matches(*item, profile, criteria))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PetStatus;

    fn pet(id: u64, name: &str, breed: &str, status: &str) -> Pet {
        Pet {
            id,
            name: name.to_string(),
            breed: breed.to_string(),
            category: "Perro".to_string(),
            sex: "Macho".to_string(),
            birth_date: None,
            weight: None,
            sterilized: None,
            size: None,
            description: String::new(),
            status: PetStatus::parse(status),
            images: Vec::new(),
            department: None,
            municipality: None,
        }
    }

    fn names(items: Vec<&Pet>) -> Vec<&str> {
        items.into_iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn public_listing_hides_reserved_and_adopted() {
        let snapshot = vec![
            pet(1, "Fido", "Criollo", "Adoptado"),
            pet(2, "Rex", "Criollo", "Urgente"),
            pet(3, "Nala", "Criollo", "Reservado"),
        ];
        let shown = apply(&snapshot, &ListingProfile::PUBLIC_PETS, &FilterCriteria::new("", "Todos"));
        assert_eq!(names(shown), vec!["Rex"]);
    }

    #[test]
    fn exclusion_wins_over_explicit_status() {
        let snapshot = vec![pet(1, "Fido", "Criollo", "Adoptado")];
        let criteria = FilterCriteria::new("", "Adoptado");
        assert!(apply(&snapshot, &ListingProfile::PUBLIC_PETS, &criteria).is_empty());
        assert_eq!(apply(&snapshot, &ListingProfile::ADMIN_PETS, &criteria).len(), 1);
    }

    #[test]
    fn query_is_case_insensitive() {
        let snapshot = vec![pet(1, "Toby", "Rojo", "Urgente"), pet(2, "Max", "Beagle", "Urgente")];
        let shown = apply(&snapshot, &ListingProfile::ADMIN_PETS, &FilterCriteria::new("ROJ", "todos"));
        assert_eq!(names(shown), vec!["Toby"]);
    }

    #[test]
    fn query_only_searches_profile_fields() {
        let snapshot = vec![pet(1, "Toby", "Beagle", "Urgente")];
        // category "Perro" is searched publicly but not on the admin screen
        let criteria = FilterCriteria::new("perro", "Todos");
        assert_eq!(apply(&snapshot, &ListingProfile::PUBLIC_PETS, &criteria).len(), 1);
        assert!(apply(&snapshot, &ListingProfile::ADMIN_PETS, &criteria).is_empty());
    }

    #[test]
    fn status_match_is_exact() {
        let snapshot = vec![pet(1, "A", "x", "Urgente"), pet(2, "B", "x", "En Adopcion")];
        let shown = apply(&snapshot, &ListingProfile::ADMIN_PETS, &FilterCriteria::new("", "urgente"));
        assert!(shown.is_empty());
        let shown = apply(&snapshot, &ListingProfile::ADMIN_PETS, &FilterCriteria::new("", "En Adopcion"));
        assert_eq!(names(shown), vec!["B"]);
    }

    #[test]
    fn order_is_preserved() {
        let snapshot = vec![
            pet(3, "Cleo", "x", "Urgente"),
            pet(1, "Ana", "x", "Urgente"),
            pet(2, "Bo", "x", "Urgente"),
        ];
        let shown = apply(&snapshot, &ListingProfile::ADMIN_PETS, &FilterCriteria::default());
        assert_eq!(names(shown), vec!["Cleo", "Ana", "Bo"]);
    }

    #[test]
    fn todos_means_all() {
        assert_eq!(StatusFilter::from_key("Todos"), StatusFilter::All);
        assert_eq!(StatusFilter::from_key("todos"), StatusFilter::All);
        assert_eq!(
            StatusFilter::from_key("Urgente"),
            StatusFilter::Only("Urgente".to_string())
        );
    }
}
