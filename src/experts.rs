//! Directory of verification experts.
//!
//! Static demo dataset; a registry service replaces this eventually.

use serde::{Deserialize, Serialize};

/// An expert who can attest to an asset's authenticity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Expert {
    pub id: String,
    pub name: String,
}

/// Experts grouped by location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpertGroup {
    pub name: String,
    pub experts: Vec<Expert>,
}

fn expert(id: &str, name: &str) -> Expert {
    Expert {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn watch_experts() -> Vec<Expert> {
    vec![
        expert("1859159", "The Watch Gallery (Rolex Boutique)"),
        expert("41859189", "Watches of Switzerland"),
    ]
}

fn jewelry_experts() -> Vec<Expert> {
    vec![
        expert("5615641", "Royal Exchange Jewellers"),
        expert("1564156", "Jonathan Geeves Jewellers"),
        expert("9486451", "Tawny Phillips"),
    ]
}

/// Lookup of experts by category and id.
#[derive(Debug, Clone, Default)]
pub struct ExpertDirectory;

impl ExpertDirectory {
    pub fn new() -> Self {
        Self
    }

    /// Experts able to verify assets of the given category, grouped by
    /// location. The location parameter is currently ignored.
    pub fn get_experts(&self, _location: Option<&str>, category: &str) -> Vec<ExpertGroup> {
        let experts = match category {
            "Watch" => watch_experts(),
            _ => jewelry_experts(),
        };
        vec![ExpertGroup {
            name: "London".to_string(),
            experts,
        }]
    }

    pub fn get_expert_by_id(&self, expert_id: &str) -> Option<Expert> {
        let mut all = watch_experts();
        all.extend(jewelry_experts());
        all.into_iter().find(|e| e.id == expert_id)
    }
}
