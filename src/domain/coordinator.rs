// src/domain/coordinator.rs

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::profile::{CoordinatorProfileData, Profile, User};
use crate::domain::resolver::{PrioritizedResolver, Resolved, Usable};

pub const UNASSIGNED_REGION: &str = "Unassigned - Needs Region Assignment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorStatus {
    Active,
    Inactive,
    Training,
}

impl CoordinatorStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CoordinatorStatus::Active => "Active",
            CoordinatorStatus::Inactive => "Inactive",
            CoordinatorStatus::Training => "Training",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(CoordinatorStatus::Active),
            "inactive" | "suspended" => Some(CoordinatorStatus::Inactive),
            "training" | "in_training" => Some(CoordinatorStatus::Training),
            _ => None,
        }
    }
}

impl Usable for CoordinatorStatus {
    fn is_usable(&self) -> bool {
        true
    }
}

/// Everything we know about one coordinator, from both the account and the profile.
pub struct CoordinatorSources<'a> {
    pub user: &'a User,
    pub profile: Option<&'a CoordinatorProfileData>,
}

impl<'a> CoordinatorSources<'a> {
    pub fn new(user: &'a User, profile: Option<&'a Profile>) -> Self {
        Self {
            user,
            profile: profile.and_then(|p| p.data.as_coordinator()),
        }
    }

    fn metadata_str(&self, key: &str) -> Option<String> {
        self.user
            .metadata
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

fn state_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z]{2})(?:\s+\d{5}(?:-\d{4})?)?$").expect("valid state regex"))
}

/// Extracts the two-letter state code from the last comma-delimited segment of
/// a free-text address, e.g. `"123 Oak St, Madison, WI 53703"` gives `"WI"`.
pub fn state_from_address(address: &str) -> Option<String> {
    let last = address.rsplit(',').next()?.trim();
    state_code_re()
        .captures(last)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn region_resolver<'a>() -> PrioritizedResolver<'a, CoordinatorSources<'a>, String> {
    PrioritizedResolver::<'a, CoordinatorSources<'a>, String>::new(UNASSIGNED_REGION.to_string())
        .source("metadata.region", |s| s.metadata_str("region"))
        .source("profile.region", |s| {
            s.profile.and_then(|p| p.region.clone())
        })
        .source("profile.state", |s| {
            s.profile.and_then(|p| p.state.as_ref()).map(|st| st.trim().to_uppercase())
        })
        .source("profile.address", |s| {
            s.profile
                .and_then(|p| p.address.as_deref())
                .and_then(state_from_address)
        })
        .source("metadata.address", |s| {
            s.metadata_str("address").as_deref().and_then(state_from_address)
        })
}

pub fn status_resolver<'a>() -> PrioritizedResolver<'a, CoordinatorSources<'a>, CoordinatorStatus> {
    PrioritizedResolver::<'a, CoordinatorSources<'a>, CoordinatorStatus>::new(CoordinatorStatus::Inactive)
        .source("metadata.status", |s| {
            s.metadata_str("status").as_deref().and_then(CoordinatorStatus::parse)
        })
        .source("profile.status", |s| {
            s.profile
                .and_then(|p| p.status.as_deref())
                .and_then(CoordinatorStatus::parse)
        })
        .source("profile.training", |s| {
            let p = s.profile?;
            match (p.training_started, p.training_completed) {
                (_, Some(true)) => Some(CoordinatorStatus::Active),
                (Some(true), _) => Some(CoordinatorStatus::Training),
                _ => None,
            }
        })
}

pub fn coordinator_region(sources: &CoordinatorSources) -> Resolved<String> {
    region_resolver().resolve(sources)
}

pub fn coordinator_status(sources: &CoordinatorSources) -> CoordinatorStatus {
    status_resolver().resolve(sources).value
}

/// Table row for the local coordinators page.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub status: CoordinatorStatus,
    pub region: String,
    pub needs_region: bool,
    pub host_families: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorFilter {
    #[default]
    All,
    Active,
    Inactive,
    Training,
    Unassigned,
}

impl CoordinatorFilter {
    pub const ALL: [CoordinatorFilter; 5] = [
        CoordinatorFilter::All,
        CoordinatorFilter::Active,
        CoordinatorFilter::Inactive,
        CoordinatorFilter::Training,
        CoordinatorFilter::Unassigned,
    ];

    /// Unknown values show everything.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("active") => CoordinatorFilter::Active,
            Some("inactive") => CoordinatorFilter::Inactive,
            Some("training") => CoordinatorFilter::Training,
            Some("unassigned") => CoordinatorFilter::Unassigned,
            _ => CoordinatorFilter::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatorFilter::All => "all",
            CoordinatorFilter::Active => "active",
            CoordinatorFilter::Inactive => "inactive",
            CoordinatorFilter::Training => "training",
            CoordinatorFilter::Unassigned => "unassigned",
        }
    }

    pub fn matches(&self, row: &CoordinatorRow) -> bool {
        match self {
            CoordinatorFilter::All => true,
            CoordinatorFilter::Active => row.status == CoordinatorStatus::Active,
            CoordinatorFilter::Inactive => row.status == CoordinatorStatus::Inactive,
            CoordinatorFilter::Training => row.status == CoordinatorStatus::Training,
            CoordinatorFilter::Unassigned => row.needs_region,
        }
    }
}

pub fn coordinator_row(user: &User, profile: Option<&Profile>, host_families: usize) -> CoordinatorRow {
    let sources = CoordinatorSources::new(user, profile);
    let region = coordinator_region(&sources);
    CoordinatorRow {
        user_id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        status: coordinator_status(&sources),
        needs_region: region.is_fallback(),
        region: region.value,
        host_families,
    }
}
