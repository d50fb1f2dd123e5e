//! Outbound model consumed by the health checker.
//!
//! # Data Flow
//! ```text
//! Router ── flat outbounds (by tag)
//!    └── providers ── outbounds
//!
//! Outbound
//!     Direct / Proxy(url)   → concrete, probed by a UrlTester
//!     Group(members, now)   → virtual, resolver.rs follows `now`
//! ```
//!
//! # Design Decisions
//! - Group vs. concrete outbound is an enum variant, not a runtime type probe
//! - A group's selection is swapped atomically, readers never block

pub mod provider;
pub mod resolver;
pub mod router;
pub mod tester;

use arc_swap::ArcSwap;
use std::sync::Arc;
use url::Url;

pub use provider::{OutboundProvider, StaticProvider};
pub use resolver::resolve;
pub use router::{Router, StaticRouter};
pub use tester::{HttpUrlTester, UrlTester};

/// A configured egress path.
#[derive(Debug)]
pub struct Outbound {
    tag: String,
    kind: OutboundKind,
}

/// What an outbound does with traffic.
#[derive(Debug)]
pub enum OutboundKind {
    /// Connect directly from this host.
    Direct,
    /// Relay through a proxy server (http, https or socks5 URL).
    Proxy(Url),
    /// Delegate to the currently selected member.
    Group(Group),
}

/// Member list and current selection of a group outbound.
#[derive(Debug)]
pub struct Group {
    members: Vec<String>,
    selected: ArcSwap<String>,
}

impl Group {
    /// Create a group selecting `selected`, or the first member when `None`.
    pub fn new(members: Vec<String>, selected: Option<String>) -> Self {
        let selected = selected
            .or_else(|| members.first().cloned())
            .unwrap_or_default();
        Self {
            members,
            selected: ArcSwap::from_pointee(selected),
        }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Tag of the member the group currently points to.
    pub fn selected(&self) -> Arc<String> {
        self.selected.load_full()
    }

    /// Point the group at `tag`; returns `false` if it is not a member.
    pub fn select(&self, tag: &str) -> bool {
        if !self.members.iter().any(|m| m == tag) {
            return false;
        }
        self.selected.store(Arc::new(tag.to_string()));
        true
    }
}

impl Outbound {
    pub fn direct(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            kind: OutboundKind::Direct,
        }
    }

    pub fn proxy(tag: impl Into<String>, url: Url) -> Self {
        Self {
            tag: tag.into(),
            kind: OutboundKind::Proxy(url),
        }
    }

    pub fn group(tag: impl Into<String>, group: Group) -> Self {
        Self {
            tag: tag.into(),
            kind: OutboundKind::Group(group),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn kind(&self) -> &OutboundKind {
        &self.kind
    }

    /// The group payload, if this is a virtual outbound.
    pub fn as_group(&self) -> Option<&Group> {
        match &self.kind {
            OutboundKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn is_group(&self) -> bool {
        self.as_group().is_some()
    }
}
