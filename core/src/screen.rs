//! Listing screen: snapshot, filters, refresh policy and mutations together.
//!
//! # Design
//! A `ListingScreen` is owned by one host screen for its lifetime. The host
//! forwards lifecycle events and user input; the screen answers with the
//! requests to execute (`PendingFetch`, `PendingMutation`) and is told the
//! results. Which endpoint backs the listing and how its body is parsed is
//! a `ListingSource`, so the four pet and adoption listings plus the vaccine
//! listing share one implementation.

use tracing::{debug, warn};

use crate::client::AdoptaClient;
use crate::error::ApiError;
use crate::filter::{self, FilterCriteria, Filterable, ListingProfile, StatusFilter};
use crate::http::{HttpRequest, HttpResponse};
use crate::refresh::{
    MutationGuard, MutationKey, MutationKind, MutationTicket, Refresh, RefreshTrigger, ScreenEvent,
};
use crate::store::{CollectionStore, FetchOutcome, FetchTicket, LoadState, Notification};
use crate::types::{
    AdoptionAction, AdoptionId, AdoptionRequest, AdoptionStage, Pet, PetForm, PetId, UserId,
    Vaccine, VaccineForm,
};

/// Where a listing reads from.
pub trait ListingSource {
    type Item: Filterable;

    /// Collection name used in logs.
    fn name(&self) -> &'static str;

    fn build(&self, client: &AdoptaClient) -> HttpRequest;

    fn parse(
        &self,
        client: &AdoptaClient,
        response: HttpResponse,
    ) -> Result<Vec<Self::Item>, ApiError>;
}

/// Every pet, as listed by `/mascotas/listar`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPets;

impl ListingSource for AllPets {
    type Item = Pet;

    fn name(&self) -> &'static str {
        "pets"
    }

    fn build(&self, client: &AdoptaClient) -> HttpRequest {
        client.build_list_pets()
    }

    fn parse(&self, client: &AdoptaClient, response: HttpResponse) -> Result<Vec<Pet>, ApiError> {
        client.parse_list_pets(response)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllVaccines;

impl ListingSource for AllVaccines {
    type Item = Vaccine;

    fn name(&self) -> &'static str {
        "vaccines"
    }

    fn build(&self, client: &AdoptaClient) -> HttpRequest {
        client.build_list_vaccines()
    }

    fn parse(&self, client: &AdoptaClient, response: HttpResponse) -> Result<Vec<Vaccine>, ApiError> {
        client.parse_list_vaccines(response)
    }
}

/// Adoption requests of one user at one lifecycle stage.
///
/// Only the two stages the backend lists can be built.
#[derive(Debug, Clone, Copy)]
pub struct UserAdoptions {
    user: UserId,
    stage: AdoptionStage,
}

impl UserAdoptions {
    pub fn pending(user: UserId) -> Self {
        Self {
            user,
            stage: AdoptionStage::InProcess,
        }
    }

    pub fn accepted(user: UserId) -> Self {
        Self {
            user,
            stage: AdoptionStage::Accepted,
        }
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn stage(&self) -> AdoptionStage {
        self.stage
    }
}

impl ListingSource for UserAdoptions {
    type Item = AdoptionRequest;

    fn name(&self) -> &'static str {
        match self.stage {
            AdoptionStage::InProcess => "pending adoptions",
            AdoptionStage::Accepted => "accepted adoptions",
        }
    }

    fn build(&self, client: &AdoptaClient) -> HttpRequest {
        match self.stage {
            AdoptionStage::InProcess => client.build_list_pending_adoptions(self.user),
            AdoptionStage::Accepted => client.build_list_accepted_adoptions(self.user),
        }
    }

    fn parse(
        &self,
        client: &AdoptaClient,
        response: HttpResponse,
    ) -> Result<Vec<AdoptionRequest>, ApiError> {
        client.parse_list_adoptions(response, self.stage)
    }
}

/// A fetch the host must execute and report back with `receive`.
#[derive(Debug, Clone)]
pub struct PendingFetch {
    pub ticket: FetchTicket,
    pub request: HttpRequest,
}

/// A mutation the host must execute and report back with `finish_mutation`.
#[derive(Debug)]
pub struct PendingMutation {
    pub ticket: MutationTicket,
    pub request: HttpRequest,
}

pub struct ListingScreen<S: ListingSource> {
    client: AdoptaClient,
    source: S,
    profile: ListingProfile,
    criteria: FilterCriteria,
    store: CollectionStore<S::Item>,
    trigger: RefreshTrigger,
    guard: MutationGuard,
}

impl ListingScreen<AllPets> {
    /// Public catalogue; reserved and adopted pets never show.
    pub fn public_pets(client: AdoptaClient) -> Self {
        Self::new(client, AllPets, ListingProfile::PUBLIC_PETS)
    }

    /// Administrator catalogue with every pet.
    pub fn admin_pets(client: AdoptaClient) -> Self {
        Self::new(client, AllPets, ListingProfile::ADMIN_PETS)
    }
}

impl ListingScreen<UserAdoptions> {
    /// Requests the signed-in user has in process.
    pub fn pending_adoptions(client: AdoptaClient) -> Result<Self, ApiError> {
        let source = UserAdoptions::pending(client.session().user_id()?);
        Ok(Self::new(client, source, ListingProfile::PENDING_ADOPTIONS))
    }

    /// Adoptions of the signed-in user that were accepted.
    pub fn accepted_adoptions(client: AdoptaClient) -> Result<Self, ApiError> {
        let source = UserAdoptions::accepted(client.session().user_id()?);
        Ok(Self::new(client, source, ListingProfile::ACCEPTED_ADOPTIONS))
    }
}

impl ListingScreen<AllVaccines> {
    pub fn vaccines(client: AdoptaClient) -> Self {
        Self::new(client, AllVaccines, ListingProfile::VACCINES)
    }
}

impl<S: ListingSource> ListingScreen<S> {
    pub fn new(client: AdoptaClient, source: S, profile: ListingProfile) -> Self {
        let store = CollectionStore::new(source.name());
        Self {
            client,
            source,
            profile,
            criteria: FilterCriteria::default(),
            store,
            trigger: RefreshTrigger::new(),
            guard: MutationGuard::new(),
        }
    }

    pub fn client(&self) -> &AdoptaClient {
        &self.client
    }

    pub fn state(&self) -> LoadState {
        self.store.state()
    }

    pub fn error(&self) -> Option<&str> {
        self.store.error()
    }

    pub fn snapshot(&self) -> &[S::Item] {
        self.store.snapshot()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Items to display: the snapshot after this screen's filters.
    pub fn visible(&self) -> Vec<&S::Item> {
        filter::apply(self.store.snapshot(), &self.profile, &self.criteria)
    }

    pub fn set_query(&mut self, query: &str) {
        self.criteria.query = query.to_string();
    }

    pub fn set_status(&mut self, status_key: &str) {
        self.criteria.status = StatusFilter::from_key(status_key);
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.store.take_notification()
    }

    /// Forward a lifecycle event. Returns the fetch to run, if one is due.
    pub fn handle(&mut self, event: ScreenEvent) -> Option<PendingFetch> {
        match self.trigger.on_event(event) {
            Refresh::Fetch => Some(self.fetch()),
            Refresh::Skip => None,
            Refresh::Deactivate => {
                self.store.deactivate();
                self.guard.clear();
                None
            }
        }
    }

    fn fetch(&mut self) -> PendingFetch {
        PendingFetch {
            ticket: self.store.begin_fetch(),
            request: self.source.build(&self.client),
        }
    }

    /// Report the outcome of a `PendingFetch`.
    pub fn receive(
        &mut self,
        ticket: FetchTicket,
        response: Result<HttpResponse, ApiError>,
    ) -> FetchOutcome {
        let parsed = response.and_then(|r| self.source.parse(&self.client, r));
        self.store.complete_fetch(ticket, parsed)
    }

    /// Start a mutation unless the same one is already submitting.
    ///
    /// A request that fails to build (e.g. invalid form) releases the guard
    /// and queues one error notification; no refetch follows because
    /// nothing was sent.
    pub fn begin_mutation(
        &mut self,
        key: MutationKey,
        build: impl FnOnce(&AdoptaClient) -> Result<HttpRequest, ApiError>,
    ) -> Result<PendingMutation, ApiError> {
        let ticket = self.guard.try_begin(key)?;
        match build(&self.client) {
            Ok(request) => Ok(PendingMutation { ticket, request }),
            Err(err) => {
                self.guard.finish(ticket);
                self.store.notify(Notification::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Report the outcome of a `PendingMutation`.
    ///
    /// Queues exactly one notification and, whether the mutation succeeded
    /// or not, returns the refetch that reconciles the listing with the
    /// server.
    pub fn finish_mutation(
        &mut self,
        ticket: MutationTicket,
        response: Result<HttpResponse, ApiError>,
    ) -> Option<PendingFetch> {
        let kind = ticket.key().kind;
        if !self.guard.finish(ticket) {
            // Submitted before the screen was last unmounted.
            debug!(collection = self.source.name(), mutation = %kind, "stale mutation settled");
            return self.handle(ScreenEvent::MutationSettled);
        }

        match response.and_then(|r| self.client.parse_mutation(r)) {
            Ok(outcome) => {
                let message = outcome
                    .message
                    .unwrap_or_else(|| kind.done_message().to_string());
                self.store.notify(Notification::success(message));
            }
            Err(err) => {
                warn!(collection = self.source.name(), mutation = %kind, error = %err, "mutation failed");
                self.store.notify(Notification::error(err.to_string()));
            }
        }

        self.handle(ScreenEvent::MutationSettled)
    }

    pub fn is_submitting(&self, key: &MutationKey) -> bool {
        self.guard.is_submitting(key)
    }

    pub fn delete_pet(&mut self, pet: PetId) -> Result<PendingMutation, ApiError> {
        self.begin_mutation(MutationKey::new(MutationKind::DeletePet, Some(pet)), |c| {
            Ok(c.build_delete_pet(pet))
        })
    }

    pub fn create_pet(
        &mut self,
        form: &PetForm,
        today: chrono::NaiveDate,
    ) -> Result<PendingMutation, ApiError> {
        self.begin_mutation(MutationKey::new(MutationKind::CreatePet, None), |c| {
            c.build_create_pet(form, today)
        })
    }

    pub fn update_pet(
        &mut self,
        pet: PetId,
        form: &PetForm,
        today: chrono::NaiveDate,
    ) -> Result<PendingMutation, ApiError> {
        self.begin_mutation(MutationKey::new(MutationKind::UpdatePet, Some(pet)), |c| {
            c.build_update_pet(pet, form, today)
        })
    }

    pub fn create_vaccine(
        &mut self,
        form: &VaccineForm,
        today: chrono::NaiveDate,
    ) -> Result<PendingMutation, ApiError> {
        self.begin_mutation(MutationKey::new(MutationKind::CreateVaccine, None), |c| {
            c.build_create_vaccine(form, today)
        })
    }

    pub fn start_adoption(&mut self, pet: PetId) -> Result<PendingMutation, ApiError> {
        self.begin_mutation(MutationKey::new(MutationKind::StartAdoption, Some(pet)), |c| {
            c.build_start_adoption(pet)
        })
    }

    pub fn administer_adoption(
        &mut self,
        adoption: AdoptionId,
        action: AdoptionAction,
    ) -> Result<PendingMutation, ApiError> {
        let kind = match action {
            AdoptionAction::Accept => MutationKind::AcceptAdoption,
            AdoptionAction::Deny => MutationKind::DenyAdoption,
        };
        self.begin_mutation(MutationKey::new(kind, Some(adoption)), |c| {
            c.build_administer_adoption(adoption, action)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::http::HttpMethod;
    use crate::session::Session;
    use crate::store::NotificationKind;
    use crate::types::{Role, User};

    const PETS: &str = r#"[
        {"id_mascota":1,"nombre_mascota":"Fido","raza":"Criollo","categoria":"Perro","sexo":"Macho","estado":"Adoptado","imagenes":""},
        {"id_mascota":2,"nombre_mascota":"Rex","raza":"Rojo","categoria":"Perro","sexo":"Macho","estado":"Urgente","imagenes":"a.jpg,b.jpg"}
    ]"#;

    fn client() -> AdoptaClient {
        AdoptaClient::with_base_url("http://localhost:3000")
    }

    fn signed_in() -> AdoptaClient {
        let user = User {
            id: 8,
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

    fn loaded_admin_screen() -> ListingScreen<AllPets> {
        let mut screen = ListingScreen::admin_pets(client());
        let fetch = screen.handle(ScreenEvent::Mounted).unwrap();
        screen.receive(fetch.ticket, Ok(HttpResponse::new(200, PETS)));
        screen
    }

    #[test]
    fn mount_fetches_pet_listing() {
        let mut screen = ListingScreen::public_pets(client());
        let fetch = screen.handle(ScreenEvent::Mounted).unwrap();
        assert_eq!(fetch.request.method, HttpMethod::Get);
        assert_eq!(fetch.request.path, "http://localhost:3000/mascotas/listar");
        assert_eq!(screen.state(), LoadState::Loading);
    }

    #[test]
    fn public_listing_shows_only_adoptable_pets() {
        let mut screen = ListingScreen::public_pets(client());
        let fetch = screen.handle(ScreenEvent::Mounted).unwrap();
        let outcome = screen.receive(fetch.ticket, Ok(HttpResponse::new(200, PETS)));
        assert_eq!(outcome, FetchOutcome::Applied { len: 2 });

        screen.set_query("");
        screen.set_status("Todos");
        let visible: Vec<&str> = screen.visible().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(visible, vec!["Rex"]);
        assert_eq!(screen.snapshot().len(), 2);
    }

    #[test]
    fn filters_recompute_on_input() {
        let mut screen = loaded_admin_screen();
        assert_eq!(screen.visible().len(), 2);
        screen.set_query("ROJ");
        assert_eq!(screen.visible()[0].name, "Rex");
        screen.set_query("");
        screen.set_status("Adoptado");
        assert_eq!(screen.visible()[0].name, "Fido");
    }

    #[test]
    fn failed_fetch_keeps_last_snapshot() {
        let mut screen = loaded_admin_screen();
        screen.handle(ScreenEvent::Blurred);
        let fetch = screen.handle(ScreenEvent::Focused).unwrap();
        let outcome = screen.receive(fetch.ticket, Err(ApiError::Transport("offline".to_string())));
        assert_eq!(outcome, FetchOutcome::Failed);
        assert_eq!(screen.state(), LoadState::Error);
        assert_eq!(screen.visible().len(), 2);

        let note = screen.take_notification().unwrap();
        assert_eq!(note.kind, NotificationKind::Error);
        assert_eq!(note.message, "network error: offline");
        assert!(screen.take_notification().is_none());
    }

    #[test]
    fn rejected_delete_refetches_once_and_item_stays() {
        let mut screen = loaded_admin_screen();

        let mutation = screen.delete_pet(2).unwrap();
        assert_eq!(mutation.request.method, HttpMethod::Delete);
        assert!(screen.delete_pet(2).is_err());

        let refetch = screen
            .finish_mutation(
                mutation.ticket,
                Ok(HttpResponse::new(500, r#"{"message":"No se pudo eliminar"}"#)),
            )
            .expect("a refetch after the mutation");
        assert_eq!(refetch.request.path, "http://localhost:3000/mascotas/listar");

        let note = screen.take_notification().unwrap();
        assert_eq!(note.kind, NotificationKind::Error);
        assert_eq!(note.message, "HTTP 500: No se pudo eliminar");
        assert!(screen.take_notification().is_none());

        screen.receive(refetch.ticket, Ok(HttpResponse::new(200, PETS)));
        assert!(screen.visible().iter().any(|p| p.id == 2));
        assert!(!screen.is_submitting(&MutationKey::new(MutationKind::DeletePet, Some(2))));
    }

    #[test]
    fn successful_mutation_uses_server_message() {
        let mut screen = loaded_admin_screen();
        let mutation = screen.delete_pet(1).unwrap();
        let refetch = screen.finish_mutation(
            mutation.ticket,
            Ok(HttpResponse::new(200, r#"{"message":"Mascota eliminada"}"#)),
        );
        assert!(refetch.is_some());
        let note = screen.take_notification().unwrap();
        assert_eq!(note, Notification::success("Mascota eliminada"));
    }

    #[test]
    fn invalid_form_sends_nothing() {
        let mut screen = loaded_admin_screen();
        let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let err = screen.create_pet(&PetForm::default(), today).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(
            screen.take_notification().map(|n| n.kind),
            Some(NotificationKind::Error)
        );
        assert!(!screen.is_submitting(&MutationKey::new(MutationKind::CreatePet, None)));
    }

    #[test]
    fn unmount_discards_late_response() {
        let mut screen = loaded_admin_screen();
        screen.handle(ScreenEvent::Blurred);
        let fetch = screen.handle(ScreenEvent::Focused).unwrap();
        assert!(screen.handle(ScreenEvent::Unmounted).is_none());
        let outcome = screen.receive(fetch.ticket, Ok(HttpResponse::new(200, PETS)));
        assert_eq!(outcome, FetchOutcome::Discarded);
        assert!(screen.snapshot().is_empty());
    }

    #[test]
    fn adoption_listings_need_a_user() {
        assert!(matches!(
            ListingScreen::pending_adoptions(client()),
            Err(ApiError::Unauthenticated)
        ));
        let mut screen = ListingScreen::accepted_adoptions(signed_in()).unwrap();
        let fetch = screen.handle(ScreenEvent::Mounted).unwrap();
        assert_eq!(
            fetch.request.path,
            "http://localhost:3000/adopciones/listaraceptadas/8"
        );
    }

    #[test]
    fn deny_from_pending_list_refetches() {
        let mut screen = ListingScreen::pending_adoptions(signed_in()).unwrap();
        let fetch = screen.handle(ScreenEvent::Mounted).unwrap();
        screen.receive(
            fetch.ticket,
            Ok(HttpResponse::new(
                200,
                r#"[{"id_adopcion":4,"fk_id_mascota":2,"nombre_mascota":"Rex","fk_id_raza":"Rojo","sexo":"Macho","estado":"Reservado"}]"#,
            )),
        );
        assert_eq!(screen.visible()[0].stage, AdoptionStage::InProcess);

        let mutation = screen.administer_adoption(4, AdoptionAction::Deny).unwrap();
        let refetch = screen.finish_mutation(mutation.ticket, Ok(HttpResponse::new(200, "{}")));
        assert_eq!(
            refetch.unwrap().request.path,
            "http://localhost:3000/adopciones/proceso/8"
        );
        assert_eq!(
            screen.take_notification().unwrap().message,
            "Adoption denied"
        );
    }

    #[test]
    fn remount_starts_empty_and_releases_mutations() {
        let mut screen = loaded_admin_screen();
        let key = MutationKey::new(MutationKind::DeletePet, Some(2));
        let stale = screen.delete_pet(2).unwrap();
        assert!(screen.is_submitting(&key));

        assert!(screen.handle(ScreenEvent::Unmounted).is_none());
        let fetch = screen.handle(ScreenEvent::Mounted).unwrap();

        assert!(screen.snapshot().is_empty());
        assert!(screen.visible().is_empty());
        assert_eq!(screen.state(), LoadState::Loading);
        assert!(screen.error().is_none());
        assert!(screen.take_notification().is_none());
        assert!(!screen.is_submitting(&key));

        let again = screen.delete_pet(2).unwrap();
        assert!(screen.is_submitting(&key));

        // The answer to the pre-unmount delete neither notifies nor frees
        // the new submission.
        let refetch = screen.finish_mutation(
            stale.ticket,
            Ok(HttpResponse::new(200, r#"{"message":"Mascota eliminada"}"#)),
        );
        assert!(refetch.is_some());
        assert!(screen.take_notification().is_none());
        assert!(screen.is_submitting(&key));

        screen.finish_mutation(again.ticket, Ok(HttpResponse::new(200, "{}")));
        assert!(!screen.is_submitting(&key));
        assert_eq!(
            screen.take_notification().map(|n| n.kind),
            Some(NotificationKind::Success)
        );

        assert_eq!(
            screen.receive(fetch.ticket, Ok(HttpResponse::new(200, PETS))),
            FetchOutcome::Applied { len: 2 }
        );
    }

    #[test]
    fn adoption_sources_cover_listed_stages_only() {
        let pending = UserAdoptions::pending(8);
        let accepted = UserAdoptions::accepted(8);
        assert_eq!(pending.stage(), AdoptionStage::InProcess);
        assert_eq!(accepted.stage(), AdoptionStage::Accepted);
        assert_eq!(pending.user(), 8);

        let client = signed_in();
        assert_eq!(
            pending.build(&client).path,
            "http://localhost:3000/adopciones/proceso/8"
        );
        assert_eq!(
            accepted.build(&client).path,
            "http://localhost:3000/adopciones/listaraceptadas/8"
        );

        let records = accepted
            .parse(
                &client,
                HttpResponse::new(
                    200,
                    r#"[{"id_adopcion":5,"fk_id_mascota":1,"nombre_mascota":"Fido","estado":"Adoptado"}]"#,
                ),
            )
            .unwrap();
        assert_eq!(records[0].stage, AdoptionStage::Accepted);
    }
}
