//! Ordered list of contracts to deploy.

use std::{convert::Infallible, fmt, str::FromStr};

use derive_more::Deref;
use serde::{Deserialize, Serialize};

/// The contracts to deploy, in order.
///
/// Earlier entries are deployed first. The plan is never reordered and the
/// same contract may appear more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentPlan(Vec<String>);

impl DeploymentPlan {
    pub fn new<I, S>(contracts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(contracts.into_iter().map(Into::into).collect())
    }

    pub fn contracts(&self) -> &[String] {
        &self.0
    }
}

impl FromStr for DeploymentPlan {
    type Err = Infallible;

    /// Parse a comma-separated list of contract names, ignoring blank entries.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(
            s.split(',').map(str::trim).filter(|name| !name.is_empty()),
        ))
    }
}

impl fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" -> "))
    }
}
