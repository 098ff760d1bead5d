pub mod category;
pub mod evidence;
pub mod extraction;
pub mod query;
pub mod record;
pub mod rubric;
pub mod text;

pub use category::{DocumentCategory, categorize};
pub use evidence::{
    Attachment, Consultation, DEFAULT_MAX_CATEGORY_CHARS, EvidenceAggregator, EvidenceBundle,
};
pub use extraction::{ExtractionMode, ExtractionResult, SUBSTANTIVE_THRESHOLD, is_substantive};
pub use query::LawQuery;
pub use record::{DocumentRef, LawRecord};
pub use rubric::{Criterion, CriterionScore, Rubric, RubricError, Verdict, is_valid_score};
