//! View routing
//!
//! Maps route keys (`/dashboard`, `/claim/CLM-7`, ...) to views and keeps a
//! navigation history. Unknown keys resolve to the hero view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Views the frontend can show
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewId {
    Hero,
    ClaimForm,
    Dashboard,
    Result,
    Policy,
    Evidence,
    Analytics,
    Settings,
    About,
    Pool,
    Oracle,
    /// Detail page of one claim
    ClaimDetail(String),
}

const ROUTES: &[(&str, ViewId)] = &[
    ("/", ViewId::Hero),
    ("/claim", ViewId::ClaimForm),
    ("/dashboard", ViewId::Dashboard),
    ("/result", ViewId::Result),
    ("/policy", ViewId::Policy),
    ("/evidence", ViewId::Evidence),
    ("/analytics", ViewId::Analytics),
    ("/settings", ViewId::Settings),
    ("/about", ViewId::About),
    ("/pool", ViewId::Pool),
    ("/oracle", ViewId::Oracle),
];

const CLAIM_DETAIL_PREFIX: &str = "/claim/";

/// Static route table; `/claim/{id}` is matched separately
pub fn routes() -> &'static [(&'static str, ViewId)] {
    ROUTES
}

impl ViewId {
    /// Resolve a route key
    pub fn resolve(key: &str) -> Self {
        let path = key.split(['?', '#']).next().unwrap_or_default().trim();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        if let Some(id) = path.strip_prefix(CLAIM_DETAIL_PREFIX) {
            if !id.is_empty() && !id.contains('/') {
                return Self::ClaimDetail(id.to_string());
            }
        }
        ROUTES
            .iter()
            .find(|(route, _)| *route == path)
            .map(|(_, view)| view.clone())
            .unwrap_or(Self::Hero)
    }

    /// Canonical route key
    pub fn path(&self) -> String {
        match self {
            Self::ClaimDetail(id) => format!("{CLAIM_DETAIL_PREFIX}{id}"),
            view => ROUTES
                .iter()
                .find(|(_, v)| v == view)
                .map(|(route, _)| (*route).to_string())
                .unwrap_or_else(|| "/".to_string()),
        }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Current view plus pushed history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    current: ViewId,
    history: Vec<String>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            current: ViewId::Hero,
            history: vec![ViewId::Hero.path()],
        }
    }

    pub fn current(&self) -> &ViewId {
        &self.current
    }

    /// Pushed route keys, oldest first
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// In-app navigation: updates the view and pushes history
    pub fn navigate(&mut self, key: &str) -> ViewId {
        let view = ViewId::resolve(key);
        if view != self.current {
            self.history.push(view.path());
        }
        self.current = view.clone();
        view
    }

    /// Navigation reported by the host (back/forward, deep link)
    ///
    /// Updates the view without pushing history.
    pub fn on_external_navigation(&mut self, key: &str) -> ViewId {
        self.current = ViewId::resolve(key);
        self.current.clone()
    }
}
