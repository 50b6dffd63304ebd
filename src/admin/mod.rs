//! Admin-only operations. An `Admin` can only be built from an
//! `AdminSession`, so every write goes through a verified login.

use crate::auth::AdminSession;
use crate::engine::{compute_stats, StatsSummary};
use crate::forms::{parse_ipo_form, parse_patch};
use crate::models::{Company, Documents, IpoRecord, NewCompany, RawIpoForm};
use crate::storage::Repository;
use anyhow::{Context, Result};
use tracing::info;

pub struct Admin<'a> {
    repo: &'a Repository,
    session: &'a AdminSession,
}

impl<'a> Admin<'a> {
    pub fn new(repo: &'a Repository, session: &'a AdminSession) -> Self {
        Self { repo, session }
    }

    pub fn create_company(&self, new: &NewCompany) -> Result<Company> {
        let company = self.repo.insert_company(new)?;
        info!("[{}] created company {} ({})", self.session.username(), company.name, company.id);
        Ok(company)
    }

    pub fn create_ipo(&self, form: &RawIpoForm) -> Result<IpoRecord> {
        let new = parse_ipo_form(form)?;
        let id = self.repo.insert_ipo(&new)?;
        info!("[{}] created IPO {}", self.session.username(), id);
        self.repo
            .get_ipo(id)?
            .with_context(|| format!("IPO {} vanished after insert", id))
    }

    /// `fields` are the edited `key=value` pairs; untouched fields stay.
    pub fn update_ipo<'f, I>(&self, id: i64, fields: I) -> Result<Option<IpoRecord>>
    where
        I: IntoIterator<Item = (&'f str, &'f str)>,
    {
        let patch = parse_patch(fields)?;
        let updated = self.repo.update_ipo(id, &patch)?;
        if updated.is_some() {
            info!("[{}] updated IPO {}", self.session.username(), id);
        }
        Ok(updated)
    }

    pub fn delete_ipo(&self, id: i64) -> Result<bool> {
        let deleted = self.repo.delete_ipo(id)?;
        if deleted {
            info!("[{}] deleted IPO {}", self.session.username(), id);
        }
        Ok(deleted)
    }

    pub fn save_documents(
        &self,
        ipo_id: i64,
        rhp_pdf: Option<&str>,
        drhp_pdf: Option<&str>,
    ) -> Result<Option<Documents>> {
        let docs = self.repo.upsert_documents(ipo_id, rhp_pdf, drhp_pdf)?;
        if docs.is_some() {
            info!("[{}] saved documents for IPO {}", self.session.username(), ipo_id);
        }
        Ok(docs)
    }

    /// Analytics view over every stored IPO.
    pub fn stats(&self) -> Result<StatsSummary> {
        let ipos = self.repo.list_ipos()?;
        Ok(compute_stats(&ipos))
    }

    pub fn repo(&self) -> &Repository {
        self.repo
    }
}
