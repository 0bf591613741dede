use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::CredentialVerifier;
use crate::config::Config;
use crate::discovery::job::SharedDiscoveryStatus;
use crate::discovery::signal::MarketSignalSource;
use crate::matching::extract::ResumeTextExtractor;
use crate::matching::scoring::LearningResourceLookup;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Admin credential verification seam. Default: env-backed password check.
    pub auth: Arc<dyn CredentialVerifier>,
    /// Market-signal collaborator the Discovery Job ingests from.
    pub signal_source: Arc<dyn MarketSignalSource>,
    /// Learning-suggestion lookup for missing-skill annotations.
    pub resources: Arc<dyn LearningResourceLookup>,
    /// Resume file parsing collaborator.
    pub extractor: Arc<dyn ResumeTextExtractor>,
    /// Progress of the latest discovery run, queried by the admin console.
    pub discovery_status: SharedDiscoveryStatus,
}
