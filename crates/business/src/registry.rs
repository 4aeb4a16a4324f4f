//! Registry operations - lenders, clients and co-debtors
//!
//! RegistryService maintains the parties a loan refers to. Clients are
//! never deleted, only deactivated.

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use chrono::Utc;
use lendbook_core::{
    Client, ClientDetails, CoDebtor, Event, EventType, Lender, NewCoDebtor, NewLender,
    SequenceKind,
};
use lendbook_persistence::{ClientQuery, ClientRepo, CoDebtorRepo, LenderRepo, SequenceRepo};
use tracing::info;

/// Registry Service - handles lenders, clients and co-debtors
pub struct RegistryService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RegistryService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    // === Lenders ===

    /// Register a lender; the `PRE###` code is issued by the ledger
    pub async fn create_lender(&self, actor_id: &str, new: NewLender) -> BusinessResult<Lender> {
        new.validate()?;
        let new = &new;

        let lender = self
            .ctx
            .with_retry("create_lender", move || async move {
                let mut tx = self.ctx.pool().begin().await?;
                let sequence = self.ctx.settings().sequence(SequenceKind::Lender);
                let code = SequenceRepo::issue(&mut tx, &sequence).await?;

                let lender = Lender {
                    code,
                    first_name: new.first_name.trim().to_string(),
                    last_name: new.last_name.trim().to_string(),
                    national_id: new.national_id.trim().to_string(),
                    default_rate: new.default_rate,
                    active: true,
                    created_at: Utc::now(),
                };
                LenderRepo::insert(&mut *tx, &lender).await?;
                tx.commit().await?;
                Ok::<_, BusinessError>(lender)
            })
            .await?;

        info!(code = %lender.code, "Lender created");
        self.ctx.record_event(|id| {
            Event::new(id.to_string(), EventType::LenderCreated, actor_id, &lender.code)
                .with_description(&lender.full_name())
        })?;

        Ok(lender)
    }

    pub async fn get_lender(&self, code: &str) -> BusinessResult<Lender> {
        Ok(LenderRepo::get_by_code(self.ctx.pool(), code).await?)
    }

    pub async fn list_lenders(&self, active_only: bool) -> BusinessResult<Vec<Lender>> {
        Ok(LenderRepo::list(self.ctx.pool(), active_only).await?)
    }

    // === Clients ===

    /// Register a client; the national id must not be registered yet
    pub async fn create_client(
        &self,
        actor_id: &str,
        details: ClientDetails,
    ) -> BusinessResult<Client> {
        details.validate()?;
        let pool = self.ctx.pool();

        if let Some(existing) =
            ClientRepo::find_by_national_id(pool, details.national_id.trim()).await?
        {
            return Err(BusinessError::validation(format!(
                "National id {} is already registered to client {}",
                existing.national_id, existing.id
            )));
        }

        let id = ClientRepo::insert(pool, &details, Utc::now()).await?;
        let client = ClientRepo::get_by_id(pool, id).await?;

        info!(client_id = id, "Client created");
        self.ctx.record_event(|event_id| {
            Event::new(
                event_id.to_string(),
                EventType::ClientCreated,
                actor_id,
                &id.to_string(),
            )
            .with_description(&client.full_name())
        })?;

        Ok(client)
    }

    /// Replace a client's details
    pub async fn update_client(
        &self,
        actor_id: &str,
        client_id: i64,
        details: ClientDetails,
    ) -> BusinessResult<Client> {
        details.validate()?;
        let pool = self.ctx.pool();
        ClientRepo::get_by_id(pool, client_id).await?;

        if let Some(other) =
            ClientRepo::find_by_national_id(pool, details.national_id.trim()).await?
        {
            if other.id != client_id {
                return Err(BusinessError::validation(format!(
                    "National id {} is already registered to client {}",
                    other.national_id, other.id
                )));
            }
        }

        ClientRepo::update(pool, client_id, &details, Utc::now()).await?;
        let client = ClientRepo::get_by_id(pool, client_id).await?;

        self.ctx.record_event(|event_id| {
            Event::new(
                event_id.to_string(),
                EventType::ClientUpdated,
                actor_id,
                &client_id.to_string(),
            )
        })?;

        Ok(client)
    }

    /// Mark a client inactive. Already inactive clients are returned unchanged.
    pub async fn deactivate_client(&self, actor_id: &str, client_id: i64) -> BusinessResult<Client> {
        let pool = self.ctx.pool();
        let client = ClientRepo::get_by_id(pool, client_id).await?;
        if !client.active {
            return Ok(client);
        }

        ClientRepo::set_active(pool, client_id, false, Utc::now()).await?;
        let client = ClientRepo::get_by_id(pool, client_id).await?;

        info!(client_id, "Client deactivated");
        self.ctx.record_event(|event_id| {
            Event::new(
                event_id.to_string(),
                EventType::ClientDeactivated,
                actor_id,
                &client_id.to_string(),
            )
        })?;

        Ok(client)
    }

    pub async fn get_client(&self, client_id: i64) -> BusinessResult<Client> {
        Ok(ClientRepo::get_by_id(self.ctx.pool(), client_id).await?)
    }

    /// Search clients by name, national id or phone
    pub async fn search_clients(&self, query: &ClientQuery) -> BusinessResult<Vec<Client>> {
        let mut query = query.clone();
        if query.limit.is_none() {
            query.limit = Some(self.ctx.settings().list_limit);
        }
        Ok(ClientRepo::search(self.ctx.pool(), &query).await?)
    }

    // === Co-debtors ===

    pub async fn add_codebtor(
        &self,
        actor_id: &str,
        client_id: i64,
        new: NewCoDebtor,
    ) -> BusinessResult<CoDebtor> {
        new.validate()?;
        let pool = self.ctx.pool();
        ClientRepo::get_by_id(pool, client_id).await?;

        let id = CoDebtorRepo::insert(pool, client_id, &new, Utc::now()).await?;
        let codebtor = CoDebtorRepo::get_by_id(pool, id).await?;

        self.ctx.record_event(|event_id| {
            Event::new(
                event_id.to_string(),
                EventType::CoDebtorAdded,
                actor_id,
                &client_id.to_string(),
            )
            .with_description(&codebtor.full_name)
        })?;

        Ok(codebtor)
    }

    pub async fn list_codebtors(&self, client_id: i64) -> BusinessResult<Vec<CoDebtor>> {
        let pool = self.ctx.pool();
        ClientRepo::get_by_id(pool, client_id).await?;
        Ok(CoDebtorRepo::list_by_client(pool, client_id).await?)
    }
}
