use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for underwriting assessments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssessmentId(pub String);

impl AssessmentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single motor-insurance underwriting case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub status: AssessmentStatus,
    pub vehicle_model: String,
    pub vehicle_year: i32,
    pub driver: DriverProfile,
    pub coverage: CoverageSelection,
    pub documents: Vec<DocumentReference>,
    pub comments: Vec<Comment>,
    pub risk_factors: Vec<RiskFactor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tracking_number: String,
}

impl Assessment {
    /// Whole years between manufacture and `reference_year`. Negative for future model years.
    pub fn vehicle_age(&self, reference_year: i32) -> i32 {
        reference_year - self.vehicle_year
    }

    /// Bump `updated_at` without ever moving it behind `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }

    pub fn has_document(&self, category: DocumentCategory) -> bool {
        self.documents
            .iter()
            .any(|document| document.category == category)
    }
}

/// Lifecycle status. Approved is terminal; denied may be reopened for reassessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Pending,
    Approved,
    Denied,
}

impl AssessmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AssessmentStatus::Pending => "pending",
            AssessmentStatus::Approved => "approved",
            AssessmentStatus::Denied => "denied",
        }
    }

    pub const fn can_transition_to(self, next: AssessmentStatus) -> bool {
        matches!(
            (self, next),
            (AssessmentStatus::Pending, AssessmentStatus::Approved)
                | (AssessmentStatus::Pending, AssessmentStatus::Denied)
                | (AssessmentStatus::Denied, AssessmentStatus::Pending)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub name: String,
    pub license_number: String,
    pub age: u8,
    pub experience_years: u8,
    pub previous_accidents: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSelection {
    #[serde(rename = "type")]
    pub coverage_type: CoverageType,
    pub amount: f64,
    pub deductible: f64,
    pub additional_coverages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    Liability,
    Comprehensive,
    Collision,
}

impl CoverageType {
    pub const fn label(self) -> &'static str {
        match self {
            CoverageType::Liability => "liability",
            CoverageType::Comprehensive => "comprehensive",
            CoverageType::Collision => "collision",
        }
    }

    /// Market limits per product, in AED.
    pub const fn limits(self) -> CoverageLimits {
        match self {
            CoverageType::Liability => CoverageLimits {
                minimum: 250_000.0,
                recommended: 500_000.0,
            },
            CoverageType::Comprehensive => CoverageLimits {
                minimum: 500_000.0,
                recommended: 1_000_000.0,
            },
            CoverageType::Collision => CoverageLimits {
                minimum: 350_000.0,
                recommended: 750_000.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageLimits {
    pub minimum: f64,
    pub recommended: f64,
}

/// Reference to an attached document. `category` is authoritative; `name` is what the uploader typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub name: String,
    pub category: DocumentCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    DriverLicense,
    VehicleRegistration,
    InsurancePolicy,
    InspectionCertificate,
    Other,
}

impl DocumentCategory {
    /// Key used by the name-matching document check and in violation messages.
    pub const fn key(self) -> &'static str {
        match self {
            DocumentCategory::DriverLicense => "driver_license",
            DocumentCategory::VehicleRegistration => "vehicle_registration",
            DocumentCategory::InsurancePolicy => "insurance_policy",
            DocumentCategory::InspectionCertificate => "inspection_certificate",
            DocumentCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub is_internal: bool,
}

/// Named, severity-tagged reason contributing to perceived risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub id: String,
    pub name: String,
    pub severity: RiskSeverity,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

impl RiskSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            RiskSeverity::Low => "low",
            RiskSeverity::Medium => "medium",
            RiskSeverity::High => "high",
        }
    }
}

/// Render a currency amount with thousands separators, dropping the fraction when whole.
pub fn format_amount(amount: f64) -> String {
    let total_cents = (amount.abs() * 100.0).round() as u64;
    let digits = (total_cents / 100).to_string();
    let cents = total_cents % 100;

    let mut rendered = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    if amount < 0.0 && total_cents > 0 {
        rendered.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            rendered.push(',');
        }
        rendered.push(ch);
    }
    if cents > 0 {
        rendered.push_str(&format!(".{cents:02}"));
    }
    rendered
}
