//! Market-signal ingestion seam.
//!
//! Where the signal comes from (scraped job boards, a purchased feed, a data
//! warehouse export) is a deployment concern behind `MarketSignalSource`. The
//! default source ships a representative simulated batch so the pipeline runs
//! end-to-end without external credentials.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// One job posting observed in the market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    /// Skill surface forms as they appeared in the posting.
    pub skills: Vec<String>,
    pub salary_range: Option<(i64, i64)>,
}

/// A batch of postings ingested in one discovery run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalBatch {
    pub postings: Vec<JobPosting>,
}

#[async_trait]
pub trait MarketSignalSource: Send + Sync {
    /// Fetches one batch. Failures must leave no partial state behind; the
    /// job treats any error as "zero proposals this run".
    async fn fetch_batch(&self) -> Result<SignalBatch, AppError>;
}

/// Simulated market feed. The batch deliberately contains: skills unknown to
/// the starter catalog (GraphQL, Terraform) with enough mentions to propose,
/// a posting cluster for a role the catalog lacks, broad mentions of the
/// established skills, and zero mentions of Angular so obsolescence flagging
/// has something to find.
pub struct SimulatedMarketFeed;

fn posting(title: &str, skills: &[&str], salary: Option<(i64, i64)>) -> JobPosting {
    JobPosting {
        title: title.to_string(),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        salary_range: salary,
    }
}

#[async_trait]
impl MarketSignalSource for SimulatedMarketFeed {
    async fn fetch_batch(&self) -> Result<SignalBatch, AppError> {
        Ok(SignalBatch {
            postings: vec![
                posting(
                    "Junior Web Developer",
                    &["JavaScript", "React", "GraphQL", "Git", "CSS"],
                    Some((60_000, 85_000)),
                ),
                posting(
                    "Junior Web Developer",
                    &["JavaScript", "React", "GraphQL", "Communication"],
                    Some((58_000, 80_000)),
                ),
                posting(
                    "Frontend Developer",
                    &["JavaScript", "React", "GraphQL", "Git"],
                    Some((70_000, 110_000)),
                ),
                posting(
                    "Junior DevOps Engineer",
                    &["Docker", "Kubernetes", "AWS", "Terraform", "Linux"],
                    Some((75_000, 105_000)),
                ),
                posting(
                    "DevOps Engineer",
                    &["AWS", "Terraform", "Docker", "Git", "Linux"],
                    Some((95_000, 135_000)),
                ),
                posting(
                    "Platform Engineer",
                    &["Kubernetes", "Terraform", "AWS", "Problem Solving"],
                    Some((100_000, 145_000)),
                ),
                posting(
                    "Junior Data Scientist",
                    &["Python", "Machine Learning", "SQL", "Statistics"],
                    Some((85_000, 115_000)),
                ),
                posting(
                    "Junior Data Scientist",
                    &["Python", "Data Analysis", "SQL", "Communication"],
                    Some((80_000, 110_000)),
                ),
                posting(
                    "Junior Data Scientist",
                    &["Python", "Machine Learning", "Statistics", "Excel"],
                    Some((82_000, 112_000)),
                ),
                posting(
                    "Data Analyst",
                    &["SQL", "Excel", "Data Analysis", "Statistics"],
                    Some((60_000, 90_000)),
                ),
                posting(
                    "Backend Developer",
                    &["Python", "SQL", "Docker", "Git", "Linux"],
                    Some((80_000, 125_000)),
                ),
                posting(
                    "Engineering Manager",
                    &["Leadership", "Communication", "Problem Solving", "Python"],
                    Some((130_000, 180_000)),
                ),
            ],
        })
    }
}
