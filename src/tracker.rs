use tracing::{debug, info, warn};

use crate::error::{ImportError, Result, SourceError};
use crate::models::{Application, ApplicationDraft, Contact};
use crate::store::Storage;
use crate::transfer;

pub const APPLICATIONS_KEY: &str = "jobApplications";
pub const SOURCES_KEY: &str = "jobSources";

pub const DEFAULT_SOURCES: [&str; 5] = ["LINKEDIN", "INDEED", "COMPANY_WEBSITE", "REFERRAL", "OTHER"];

const DELETE_PROMPT: &str = "Are you sure you want to delete this application?";
const IMPORT_PROMPT: &str = "This will replace your current data. Are you sure?";

/// Yes/no gate in front of destructive operations.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Accepts every prompt. Backs the `--yes` flags.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// The application collection and source tags, mirrored to storage after
/// every change.
pub struct Tracker<S: Storage> {
    storage: S,
    applications: Vec<Application>,
    sources: Vec<String>,
}

impl<S: Storage> Tracker<S> {
    /// Load both documents. Corrupt documents fall back to an empty collection
    /// or the default sources; only storage failures are returned.
    pub fn load(storage: S) -> Result<Self> {
        let applications = match storage.get(APPLICATIONS_KEY)? {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<serde_json::Value>(&raw)
                .map_err(ImportError::from)
                .and_then(transfer::parse_document)
            {
                Ok(apps) => apps,
                Err(e) => {
                    warn!(error = %e, "stored applications are unreadable, starting empty");
                    Vec::new()
                }
            },
        };

        let sources = match storage.get(SOURCES_KEY)? {
            None => default_sources(),
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "stored sources are unreadable, using defaults");
                default_sources()
            }),
        };

        debug!(
            applications = applications.len(),
            sources = sources.len(),
            "loaded tracker"
        );
        Ok(Self {
            storage,
            applications,
            sources,
        })
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.id == id)
    }

    /// Applications whose id starts with `prefix`. An exact id match wins.
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<&Application> {
        if let Some(app) = self.get(prefix) {
            return vec![app];
        }
        self.applications
            .iter()
            .filter(|a| a.id.starts_with(prefix))
            .collect()
    }

    pub fn create(&mut self, draft: ApplicationDraft) -> Result<Application> {
        draft.validate()?;
        let mut id = transfer::new_id();
        while self.get(&id).is_some() {
            id = transfer::new_id();
        }
        let app = Application::new(id, draft);
        self.applications.push(app.clone());
        self.persist_applications()?;
        info!(id = %app.id, company = %app.details.company, "created application");
        Ok(app)
    }

    /// Replace every field but the id. Unknown ids leave the collection as it is.
    pub fn update(&mut self, id: &str, draft: ApplicationDraft) -> Result<Option<Application>> {
        let Some(app) = self.applications.iter_mut().find(|a| a.id == id) else {
            debug!(id, "update of unknown application ignored");
            return Ok(None);
        };
        draft.validate()?;
        app.details = draft;
        let updated = app.clone();
        self.persist_applications()?;
        Ok(Some(updated))
    }

    /// Returns whether a record was removed. Nothing is removed unless the
    /// confirmation is accepted.
    pub fn delete(&mut self, id: &str, confirm: &mut dyn Confirm) -> Result<bool> {
        let Some(index) = self.applications.iter().position(|a| a.id == id) else {
            return Ok(false);
        };
        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(false);
        }
        let removed = self.applications.remove(index);
        self.persist_applications()?;
        info!(id = %removed.id, "deleted application");
        Ok(true)
    }

    /// Returns the new favorite flag, or `None` for an unknown id.
    pub fn toggle_favorite(&mut self, id: &str) -> Result<Option<bool>> {
        let Some(app) = self.applications.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        app.details.favorite = !app.details.favorite;
        let favorite = app.details.favorite;
        self.persist_applications()?;
        Ok(Some(favorite))
    }

    pub fn add_contact(&mut self, id: &str, contact: Contact) -> Result<Option<Application>> {
        let Some(app) = self.get(id) else {
            return Ok(None);
        };
        let mut draft = app.details.clone();
        draft.contacts.push(contact);
        self.update(id, draft)
    }

    /// Remove the contact at zero-based `index`. Out-of-range indexes are a no-op.
    pub fn remove_contact(&mut self, id: &str, index: usize) -> Result<Option<Application>> {
        let Some(app) = self.get(id) else {
            return Ok(None);
        };
        if index >= app.details.contacts.len() {
            return Ok(Some(app.clone()));
        }
        let mut draft = app.details.clone();
        draft.contacts.remove(index);
        self.update(id, draft)
    }

    /// Replace the whole collection with already-parsed records, if confirmed.
    pub fn commit_import(
        &mut self,
        records: Vec<Application>,
        confirm: &mut dyn Confirm,
    ) -> Result<bool> {
        if !confirm.confirm(IMPORT_PROMPT) {
            return Ok(false);
        }
        let count = records.len();
        self.applications = records;
        self.persist_applications()?;
        info!(count, "imported applications");
        Ok(true)
    }

    pub fn export(&self) -> Result<String> {
        Ok(transfer::export_document(&self.applications)?)
    }

    /// The display view: search filter on company, position and location, then
    /// favorites first and newest applied date first.
    pub fn view(&self, search: &str) -> Vec<&Application> {
        let needle = search.to_lowercase();
        let mut view: Vec<&Application> = self
            .applications
            .iter()
            .filter(|a| a.details.matches(&needle))
            .collect();
        view.sort_by(|a, b| {
            b.details
                .favorite
                .cmp(&a.details.favorite)
                .then_with(|| b.details.applied_date.cmp(&a.details.applied_date))
        });
        view
    }

    pub fn add_source(&mut self, label: &str) -> Result<String> {
        let label = label.trim();
        if label.is_empty() {
            return Err(SourceError::Blank.into());
        }
        if self.sources.iter().any(|s| s == label) {
            return Err(SourceError::Duplicate(label.to_string()).into());
        }
        self.sources.push(label.to_string());
        self.persist_sources()?;
        Ok(label.to_string())
    }

    pub fn remove_source(&mut self, label: &str) -> Result<bool> {
        let before = self.sources.len();
        self.sources.retain(|s| s != label);
        if self.sources.len() == before {
            return Ok(false);
        }
        self.persist_sources()?;
        Ok(true)
    }

    fn persist_applications(&mut self) -> Result<()> {
        let doc = serde_json::to_string(&self.applications)?;
        self.storage.set(APPLICATIONS_KEY, &doc)
    }

    fn persist_sources(&mut self) -> Result<()> {
        let doc = serde_json::to_string(&self.sources)?;
        self.storage.set(SOURCES_KEY, &doc)
    }

    #[cfg(test)]
    pub(crate) fn storage(&self) -> &S {
        &self.storage
    }
}

fn default_sources() -> Vec<String> {
    DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
}
