pub mod builder;
pub mod cycle;
pub mod filter;
pub mod generate;
pub mod hashtags;
pub mod lifecycle;
pub mod relevance;
pub mod traits;

pub use cycle::{CycleReport, CycleRunner, Stage};
pub use lifecycle::{EditRequest, LifecycleController, ModerationDecision};
pub use traits::{CandidateGenerator, GenerationParams, PollPublisher, PostSource, PublishedPoll};
