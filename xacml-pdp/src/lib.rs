//! # XACML PDP
//!
//! The policy decision point engine: the orchestration layer over
//! `xacml-core`, `xacml-eval`, and `xacml-policy`.
//!
//! This crate provides:
//! - The abstract request/response model the wire parsers target
//! - Request preprocessing, including the Multiple Decision Profile's
//!   repeated-attribute-categories fan-out
//! - The decision cache contract and a bounded in-memory implementation
//! - The attribute provider registry with init-time dependency checking
//! - Result post-processing, including `CombinedDecision` aggregation
//! - [`PdpEngine`]: preprocess -> evaluate-per-individual -> cache ->
//!   post-process
//!
//! # Usage
//!
//! Build a policy tree with `xacml-policy`, wrap it in a
//! [`xacml_policy::RootPolicyEvaluator`], and assemble the engine:
//!
//! ```ignore
//! let engine = PdpEngine::builder(root)
//!     .config(PdpConfig::default())
//!     .attribute_providers(registry)
//!     .build();
//! let response = engine.evaluate(&request);
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod postprocess;
pub mod preprocess;
pub mod provider_registry;
pub mod request;
pub mod response;

pub use cache::{fingerprint, DecisionCache, Fingerprint, MemoryDecisionCache};
pub use config::{PdpConfig, StandardEnvAttributeSource};
pub use engine::{PdpEngine, PdpEngineBuilder};
pub use postprocess::{CombinedDecisionPostprocessor, DefaultPostprocessor, ResultPostprocessor};
pub use preprocess::{DefaultPreprocessor, RepeatedCategoryPreprocessor, RequestPreprocessor};
pub use provider_registry::AttributeProviderRegistry;
pub use request::{IndividualDecisionRequest, Request, RequestAttribute, RequestCategory};
pub use response::{Response, ResultItem};
