// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Role-gated route table for the voting client.
//!
//! The guard only reads the session; it never changes it. Anything that is not
//! an exact role match redirects to the login page.

use serde::Serialize;

use crate::auth::{Role, SessionRecord};

pub const LOGIN_PATH: &str = "/login";

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Audience {
    Public,
    Only(Role),
    /// `/` always bounces to the login page.
    RedirectToLogin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Route {
    pub pattern: &'static str,
    pub audience: Audience,
}

pub const ROUTES: &[Route] = &[
    Route { pattern: "/login", audience: Audience::Public },
    Route { pattern: "/register", audience: Audience::Public },
    Route { pattern: "/forgot-password", audience: Audience::Public },
    Route { pattern: "/dashboard", audience: Audience::Only(Role::Voter) },
    Route { pattern: "/election/:id/candidates", audience: Audience::Only(Role::Voter) },
    Route { pattern: "/my-votes", audience: Audience::Only(Role::Voter) },
    Route { pattern: "/admin", audience: Audience::Only(Role::Admin) },
    Route { pattern: "/admin/election/create", audience: Audience::Only(Role::Admin) },
    Route { pattern: "/admin/election/:id/results", audience: Audience::Only(Role::Admin) },
    Route { pattern: "/admin/election/:id/candidates", audience: Audience::Only(Role::Admin) },
    Route { pattern: "/", audience: Audience::RedirectToLogin },
];

/// Guard verdict for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Access {
    Granted,
    Redirect(&'static str),
    NotFound,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn matches(pattern: &str, path: &str) -> bool {
    let want = segments(pattern);
    let got = segments(path);
    want.len() == got.len()
        && want
            .iter()
            .zip(&got)
            .all(|(w, g)| w.starts_with(':') || w == g)
}

/// First route whose pattern matches `path` (query string ignored).
pub fn find_route(path: &str) -> Option<&'static Route> {
    let path = path.split('?').next().unwrap_or(path);
    ROUTES.iter().find(|r| matches(r.pattern, path))
}

/// Decide whether `session` may open `path`.
pub fn check(path: &str, session: Option<&SessionRecord>) -> Access {
    let Some(route) = find_route(path) else {
        return Access::NotFound;
    };

    let access = match route.audience {
        Audience::Public => Access::Granted,
        Audience::RedirectToLogin => Access::Redirect(LOGIN_PATH),
        Audience::Only(role) => match session {
            Some(s) if s.role == role => Access::Granted,
            _ => Access::Redirect(LOGIN_PATH),
        },
    };

    tracing::debug!(path, route = route.pattern, ?access, "Route guard evaluated");
    access
}
