//! edgeprov runtime
//!
//! Everything that talks to the outside world:
//! - edgerc / signer: `.edgerc` credentials and EdgeGrid request signing
//! - transport: the `ApiTransport` HTTP capability and its reqwest client
//! - file_store: the `FileStore` capability (disk or memory)
//! - api: PAPI, GTM and EdgeWorkers call wrappers
//! - workflows: GTM, internal property, EdgeWorker, customer property
//! - orchestrator / report: one provisioning run and its `result.json`

pub mod api;
pub mod bundle;
pub mod confirm;
pub mod datacenters;
pub mod edgerc;
pub mod error;
pub mod file_store;
pub mod orchestrator;
pub mod report;
pub mod signer;
pub mod transport;
pub mod workflows;

#[cfg(test)]
mod testing;

pub use confirm::{Confirm, FixedAnswer, SharedConfirm};
pub use edgerc::Credentials;
pub use error::{ApiError, CredentialsError, FileStoreError, WorkflowError};
pub use file_store::{FileStore, LocalFileStore, MemoryFileStore, SharedFileStore};
pub use orchestrator::{RunOptions, WorkflowOrchestrator};
pub use report::RunReport;
pub use signer::EdgeGridSigner;
pub use transport::{ApiRequest, ApiResponse, ApiTransport, EdgeGridClient, SharedTransport};
pub use workflows::{GtmOptions, PropagationPoll, WorkflowContext, WorkflowKind, load_requirements};
