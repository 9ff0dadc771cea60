//! Hybrid retrieval: candidate fan-out, lexical index, feature extraction

pub mod candidates;
pub mod features;
pub mod lexical;

pub use candidates::{Candidate, CandidateBuilder, CandidateSet, ChannelKind};
pub use features::{compute_features, Features, FEATURE_DIM};
