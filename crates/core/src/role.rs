// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Worker role ladder.
//!
//! Roles form a total order from `Auxiliar` (lowest) to `Lider` (highest).
//! A role change is a promotion exactly when the new role ranks higher.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A worker's role, ordered by seniority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    Auxiliar,
    Preparador,
    LiderPreparacao,
    AplicadorAux,
    Aplicador,
    Lider,
}

impl Role {
    /// All roles from lowest to highest.
    pub const LADDER: [Role; 6] = [
        Role::Auxiliar,
        Role::Preparador,
        Role::LiderPreparacao,
        Role::AplicadorAux,
        Role::Aplicador,
        Role::Lider,
    ];

    /// Backend wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Auxiliar => "AUXILIAR",
            Role::Preparador => "PREPARADOR",
            Role::LiderPreparacao => "LIDER_PREPARACAO",
            Role::AplicadorAux => "APLICADOR_AUX",
            Role::Aplicador => "APLICADOR",
            Role::Lider => "LIDER",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Role::Auxiliar => "Auxiliar",
            Role::Preparador => "Preparador",
            Role::LiderPreparacao => "Lider Preparacao",
            Role::AplicadorAux => "Aplicador Aux.",
            Role::Aplicador => "Aplicador",
            Role::Lider => "Lider",
        }
    }

    /// Parses a wire name. Unknown or missing names map to the lowest role.
    pub fn parse_lenient(name: Option<&str>) -> Role {
        match name {
            Some("PREPARADOR") => Role::Preparador,
            Some("LIDER_PREPARACAO") => Role::LiderPreparacao,
            Some("APLICADOR_AUX") => Role::AplicadorAux,
            Some("APLICADOR") => Role::Aplicador,
            Some("LIDER") => Role::Lider,
            _ => Role::Auxiliar,
        }
    }

    /// True when moving from `old` to `new` is a step up the ladder.
    pub fn is_promotion(old: Role, new: Role) -> bool {
        new > old
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse_lenient(Some(&s))
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "role_tests.rs"]
mod tests;
