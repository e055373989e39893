//! Registry of the named collections a resync writes to.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Named bucket of synced records. Each variant maps to a fixed, namespaced identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Organizations,
    Repositories,
    Commits,
    Pulls,
    Issues,
    IssueChangelogs,
    Users,
}

impl Collection {
    /// Every collection, in the order a resync writes them.
    pub const ALL: [Collection; 7] = [
        Collection::Organizations,
        Collection::Repositories,
        Collection::Commits,
        Collection::Pulls,
        Collection::Issues,
        Collection::IssueChangelogs,
        Collection::Users,
    ];

    /// Stored identifier of the collection.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Organizations => "github_organizations",
            Collection::Repositories => "github_repositories",
            Collection::Commits => "github_commits",
            Collection::Pulls => "github_pulls",
            Collection::Issues => "github_issues",
            Collection::IssueChangelogs => "github_issue_changelogs",
            Collection::Users => "github_users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown collection '{0}'")]
pub struct UnknownCollection(pub String);

impl FromStr for Collection {
    type Err = UnknownCollection;

    /// Accepts both the stored identifier (`github_commits`) and the bare name (`commits`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix("github_").unwrap_or(s);
        Collection::ALL
            .into_iter()
            .find(|collection| collection.name().strip_prefix("github_") == Some(bare))
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}
