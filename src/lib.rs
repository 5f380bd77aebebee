//! Tessera — provider-agnostic tool orchestration
//!
//! Sits between a conversation and a set of externally hosted capabilities.
//! Each run picks a provider, advertises capabilities in that provider's
//! tool-calling dialect, executes whatever the model asks for, and folds the
//! structured side output (knowledge-graph fragments, references, binary
//! outputs) into one accumulated result.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tessera::prelude::*;
//!
//! # async fn example(
//! #     client: Arc<dyn ProviderClient>,
//! #     host: Arc<dyn CapabilityHost>,
//! # ) -> tessera::error::Result<()> {
//! let mut providers = ProviderRegistry::new();
//! providers.register("anthropic", client);
//!
//! let orchestrator = Orchestrator::new(Arc::new(providers), host, OrchestratorConfig::load()?)?;
//! let outcome = orchestrator
//!     .run("What regulates BRCA1?", &[], &RunOptions::for_provider("anthropic"))
//!     .await?;
//! println!("{}", outcome.narrative_text);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod agent_loop;
pub mod artifacts;
pub mod capability;
pub mod config;
pub mod error;
pub mod naming;
pub mod prelude;
pub mod provider;
pub mod schema;
pub mod types;
