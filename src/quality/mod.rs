//! SBOM quality scoring.
//!
//! Scores a document against a fixed rubric of three categories: the NTIA
//! minimum elements (50%), structural completeness (20%) and semantic
//! richness (30%). Scores are fractions
//! in `[0, 1]`; findings name each missing attribute and what it affects.
//!
//! # Usage
//!
//! ```no_run
//! use sbom_enrich::parsers::parse;
//! use sbom_enrich::quality::score;
//!
//! let document = parse(&std::fs::read("sbom.json").unwrap(), None).unwrap();
//! let report = score(&document);
//!
//! println!("Overall score: {:.2} ({})", report.overall, report.grade);
//! for finding in &report.findings {
//!     println!("- {finding}");
//! }
//! ```

mod rubric;
mod scorer;

pub use rubric::{checks_in, Attribute, Category, Check, Scope, RUBRIC, RUBRIC_VERSION};
pub use scorer::{
    score, CategoryScore, CheckScore, Finding, FindingSubject, QualityGrade, ScoreReport,
};
