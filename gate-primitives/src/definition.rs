//! Policy definition catalog entries.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{DefinitionId, Error, Result};

/// Closed set of check kinds a policy definition may select.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    /// Static code analysis quality gate.
    StaticCodeAnalysis,
    /// Unit-test coverage thresholds.
    UnitTests,
    /// Package allow-list over the dependency graph.
    PackageSafelist,
    /// CVE allow-list over artifact issues.
    CveSafelist,
    /// Security-issue analysis over artifact issues.
    SecurityIssueAnalysis,
}

impl DefinitionKind {
    /// Every definition kind in catalog order.
    pub const ALL: [Self; 5] = [
        Self::StaticCodeAnalysis,
        Self::UnitTests,
        Self::PackageSafelist,
        Self::CveSafelist,
        Self::SecurityIssueAnalysis,
    ];

    /// Returns the canonical key stored on catalog entries.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::StaticCodeAnalysis => "static_code_analysis",
            Self::UnitTests => "unit_tests",
            Self::PackageSafelist => "package_safelist",
            Self::CveSafelist => "cve_safelist",
            Self::SecurityIssueAnalysis => "security_issue_analysis",
        }
    }

    /// Returns the external data source this kind is evaluated against.
    #[must_use]
    pub const fn data_source(self) -> DataSource {
        match self {
            Self::StaticCodeAnalysis => DataSource::QualityReport,
            Self::UnitTests => DataSource::TestCoverage,
            Self::PackageSafelist => DataSource::DependencyGraph,
            Self::CveSafelist | Self::SecurityIssueAnalysis => DataSource::ArtifactSummary,
        }
    }

    /// Returns the default display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::StaticCodeAnalysis => "Static Code Analysis",
            Self::UnitTests => "Unit Tests",
            Self::PackageSafelist => "Package Safelist",
            Self::CveSafelist => "CVE Safelist",
            Self::SecurityIssueAnalysis => "Security Issue Analysis",
        }
    }
}

impl Display for DefinitionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DefinitionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == normalized)
            .ok_or_else(|| Error::UnknownDefinitionKey { key: s.to_owned() })
    }
}

/// External quality and security data providers.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Static-analysis quality report.
    QualityReport,
    /// Unit-test coverage report.
    TestCoverage,
    /// Resolved dependency graph.
    DependencyGraph,
    /// Artifact summary with per-artifact issue lists.
    ArtifactSummary,
}

impl DataSource {
    /// Returns a short label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::QualityReport => "quality report",
            Self::TestCoverage => "test coverage",
            Self::DependencyGraph => "dependency graph",
            Self::ArtifactSummary => "artifact summary",
        }
    }
}

impl Display for DataSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Catalog entry describing one kind of policy check.
///
/// Definitions are seeded out of band and never modified by the engine. The
/// raw `key` is kept as stored so that unknown keys can be skipped rather than
/// rejected at load time.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    /// Catalog identifier.
    pub id: DefinitionId,
    /// Human-readable name, also used as the metric of synthesized violations.
    pub name: String,
    /// Key selecting the data source and check semantics.
    pub key: String,
    /// Optional description shown to policy authors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fixed display order.
    #[serde(default)]
    pub order: u32,
}

impl PolicyDefinition {
    /// Resolves the definition key, returning `None` for unrecognized keys.
    #[must_use]
    pub fn kind(&self) -> Option<DefinitionKind> {
        self.key.parse().ok()
    }

    /// Returns the built-in catalog: one entry per [`DefinitionKind`], keyed
    /// and identified by the kind's key, in [`DefinitionKind::ALL`] order.
    #[must_use]
    pub fn standard_catalog() -> Vec<Self> {
        DefinitionKind::ALL
            .into_iter()
            .zip(0_u32..)
            .filter_map(|(kind, order)| {
                Some(Self {
                    id: DefinitionId::new(kind.key()).ok()?,
                    name: kind.display_name().to_owned(),
                    key: kind.key().to_owned(),
                    description: None,
                    order,
                })
            })
            .collect()
    }
}

/// Comparison operators available to rule specifications.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
}

impl Operator {
    /// Every operator in display order.
    pub const ALL: [Self; 6] = [
        Self::Equal,
        Self::NotEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
    ];

    /// Returns the operator name as exposed to rule authors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::NotEqual => "NOT_EQUAL",
            Self::LessThan => "LESS_THAN",
            Self::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            Self::GreaterThan => "GREATER_THAN",
            Self::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
        }
    }

    /// Returns the comparison symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
        }
    }
}
