//! Capability layer exposed to the model
//!
//! A capability is one named action the assistant can take on the
//! platform. Every handler declares an input contract, and the
//! registry turns handler outcomes into uniform payloads the model can
//! read back without special cases.

pub mod contract;
pub mod insight;
pub mod posting;
pub mod reading;
pub mod registry;
pub mod search;

pub use contract::{FieldKind, FieldSpec, InputContract, ValidatedInput};
pub use registry::{Capability, CapabilityError, CapabilityRegistry};

use crate::infrastructure::cooldown::CooldownTracker;
use crate::infrastructure::credentials::CredentialStore;
use crate::infrastructure::platform::PlatformTransport;
use std::sync::Arc;

/// Builds the full capability set in the order it is advertised to the
/// model.
pub fn builtin_registry(
    transport: Arc<PlatformTransport>,
    cooldowns: Arc<CooldownTracker>,
    credentials: Arc<CredentialStore>,
) -> CapabilityRegistry {
    CapabilityRegistry::new()
        .with(Arc::new(posting::CreatePost::new(
            transport.clone(),
            cooldowns.clone(),
        )))
        .with(Arc::new(posting::CreateComment::new(
            transport.clone(),
            cooldowns.clone(),
        )))
        .with(Arc::new(posting::Vote::new(transport.clone())))
        .with(Arc::new(posting::DeletePost::new(transport.clone())))
        .with(Arc::new(reading::GetFeed::new(transport.clone())))
        .with(Arc::new(reading::GetPost::new(transport.clone())))
        .with(Arc::new(reading::ListComments::new(transport.clone())))
        .with(Arc::new(reading::GetProfile::new(
            transport.clone(),
            credentials,
        )))
        .with(Arc::new(search::SearchPosts::new(transport.clone())))
        .with(Arc::new(insight::AnalyzeTrends::new(transport.clone())))
        .with(Arc::new(insight::AnalyzeSentiment::new(transport.clone())))
        .with(Arc::new(insight::FindTopics::new(transport.clone())))
        .with(Arc::new(insight::DetectAnomalies::new(transport)))
}
