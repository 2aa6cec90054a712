use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regulation {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: RegulationCategory,
    pub requirements: Vec<String>,
    pub last_updated: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulationCategory {
    General,
    Coverage,
    Claims,
    Documentation,
    Pricing,
}

/// Upstream feed of regulations (e.g. the insurance authority's publication API).
pub trait RegulationSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<Regulation>, RegulationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegulationError {
    #[error("regulation source unavailable: {0}")]
    Unavailable(String),
    #[error("regulation feed malformed: {0}")]
    Malformed(String),
}

/// Built-in table used until a live source has been synchronised.
#[derive(Debug, Clone, Default)]
pub struct StaticRegulations;

impl StaticRegulations {
    pub fn motor_baseline() -> Vec<Regulation> {
        let published = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let source = "UAE Insurance Authority".to_string();

        vec![
            Regulation {
                id: "reg-doc-001".to_string(),
                title: "Motor policy documentation".to_string(),
                description: "Identity and vehicle documents required before binding cover."
                    .to_string(),
                category: RegulationCategory::Documentation,
                requirements: vec![
                    "Valid UAE driving license".to_string(),
                    "Vehicle registration card".to_string(),
                ],
                last_updated: published,
                source: source.clone(),
            },
            Regulation {
                id: "reg-cov-001".to_string(),
                title: "Compulsory third-party liability".to_string(),
                description: "Every motor policy carries third-party liability at or above the \
                              statutory minimum."
                    .to_string(),
                category: RegulationCategory::Coverage,
                requirements: vec!["Minimum third-party liability coverage".to_string()],
                last_updated: published,
                source: source.clone(),
            },
            Regulation {
                id: "reg-gen-001".to_string(),
                title: "Vehicle roadworthiness".to_string(),
                description: "Vehicles must pass inspection before cover is issued.".to_string(),
                category: RegulationCategory::General,
                requirements: vec!["Vehicle inspection certificate".to_string()],
                last_updated: published,
                source,
            },
        ]
    }
}

impl RegulationSource for StaticRegulations {
    fn fetch(&self) -> Result<Vec<Regulation>, RegulationError> {
        Ok(Self::motor_baseline())
    }
}

/// Outcome of reconciling the local table against a freshly fetched one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegulationDiff {
    pub added: Vec<String>,
    pub modified: Vec<RegulationChange>,
    pub removed: Vec<String>,
}

impl RegulationDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn updated(&self) -> usize {
        self.added.len() + self.modified.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegulationChange {
    pub title: String,
    pub differences: Vec<String>,
}

pub fn diff_regulations(local: &[Regulation], remote: &[Regulation]) -> RegulationDiff {
    let mut diff = RegulationDiff::default();

    for regulation in remote {
        match local.iter().find(|candidate| candidate.id == regulation.id) {
            None => diff.added.push(regulation.title.clone()),
            Some(existing) => {
                let differences = compare(existing, regulation);
                if !differences.is_empty() {
                    diff.modified.push(RegulationChange {
                        title: regulation.title.clone(),
                        differences,
                    });
                }
            }
        }
    }

    diff.removed = local
        .iter()
        .filter(|regulation| !remote.iter().any(|candidate| candidate.id == regulation.id))
        .map(|regulation| regulation.title.clone())
        .collect();

    diff
}

fn compare(local: &Regulation, remote: &Regulation) -> Vec<String> {
    let mut differences = Vec::new();

    if local.title != remote.title {
        differences.push("Title updated".to_string());
    }
    if local.description != remote.description {
        differences.push("Description modified".to_string());
    }
    if local.category != remote.category {
        differences.push("Category changed".to_string());
    }
    if local.source != remote.source {
        differences.push("Source updated".to_string());
    }

    let local_requirements: BTreeSet<&str> =
        local.requirements.iter().map(String::as_str).collect();
    let remote_requirements: BTreeSet<&str> =
        remote.requirements.iter().map(String::as_str).collect();

    for requirement in &remote.requirements {
        if !local_requirements.contains(requirement.as_str()) {
            differences.push(format!("Added requirement: {requirement}"));
        }
    }
    for requirement in &local.requirements {
        if !remote_requirements.contains(requirement.as_str()) {
            differences.push(format!("Removed requirement: {requirement}"));
        }
    }

    differences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_reports_added_modified_and_removed() {
        let local = StaticRegulations::motor_baseline();
        let mut remote = local.clone();

        remote.remove(2);
        remote[0]
            .requirements
            .push("Emirates ID copy".to_string());
        remote[1].title = "Third-party liability".to_string();
        let mut pricing = local[0].clone();
        pricing.id = "reg-pri-001".to_string();
        pricing.title = "Premium disclosure".to_string();
        pricing.category = RegulationCategory::Pricing;
        remote.push(pricing);

        let diff = diff_regulations(&local, &remote);

        assert_eq!(diff.added, vec!["Premium disclosure".to_string()]);
        assert_eq!(diff.removed, vec!["Vehicle roadworthiness".to_string()]);
        assert_eq!(diff.modified.len(), 2);
        assert!(diff.modified[0]
            .differences
            .contains(&"Added requirement: Emirates ID copy".to_string()));
        assert_eq!(diff.modified[1].differences, vec!["Title updated".to_string()]);
        assert_eq!(diff.updated(), 3);
    }

    #[test]
    fn identical_tables_produce_empty_diff() {
        let local = StaticRegulations::motor_baseline();
        assert!(diff_regulations(&local, &local).is_empty());
    }
}
