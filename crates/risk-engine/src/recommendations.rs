//! Advice catalog
//!
//! General advice is tiered by the overall risk level; factor advice is
//! appended once per triggered factor. The prioritized catalog and the
//! per-hazard narratives back the detailed report.

use crate::aggregator::FactorType;
use crate::{Hazard, RiskLevel};
use serde::{Deserialize, Serialize};

/// Tiered general advice for an overall risk level
pub fn general_advice(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::High => &[
            "Prepare a household emergency plan and rehearse it",
            "Review insurance coverage, including compulsory earthquake insurance (DASK)",
            "Commission a structural assessment of the building",
        ],
        RiskLevel::Medium => &[
            "Follow official hazard bulletins for your area",
            "Keep an emergency go-bag ready",
        ],
        RiskLevel::Low => &["Maintain your current preparedness measures"],
    }
}

/// Specific advice for a triggered risk factor
pub fn factor_advice(factor: FactorType) -> &'static str {
    match factor {
        FactorType::Earthquake => "Reinforce the building structure against seismic loads",
        FactorType::Flood => "Check basement waterproofing and keep drains clear",
        FactorType::Fire => "Renew old electrical wiring and keep an extinguisher on every floor",
        FactorType::Landslide => "Have a slope and soil survey carried out",
        FactorType::Other => "Consult a geotechnical engineer about ground amplification",
    }
}

/// A prioritized, hazard-specific recommendation (1 = most urgent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: u32,
    pub hazard: Hazard,
    pub level: RiskLevel,
    pub title: String,
    pub description: String,
    pub priority: u8,
}

struct CatalogEntry {
    id: u32,
    hazard: Hazard,
    level: RiskLevel,
    title: &'static str,
    description: &'static str,
    priority: u8,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: 1,
        hazard: Hazard::Earthquake,
        level: RiskLevel::High,
        title: "Urgent structural reinforcement",
        description: "The building's seismic resistance is critically low. Arrange structural reinforcement without delay.",
        priority: 1,
    },
    CatalogEntry {
        id: 2,
        hazard: Hazard::Earthquake,
        level: RiskLevel::High,
        title: "Prepare an earthquake kit",
        description: "Keep water, canned food and first-aid supplies in a kit stored somewhere safe and reachable.",
        priority: 2,
    },
    CatalogEntry {
        id: 3,
        hazard: Hazard::Earthquake,
        level: RiskLevel::Medium,
        title: "Take out earthquake insurance",
        description: "Compulsory earthquake insurance (DASK) limits the financial damage of a quake.",
        priority: 2,
    },
    CatalogEntry {
        id: 4,
        hazard: Hazard::Flood,
        level: RiskLevel::High,
        title: "Take flood precautions",
        description: "Waterproof basements and ground floors and install flood barriers.",
        priority: 1,
    },
    CatalogEntry {
        id: 5,
        hazard: Hazard::Flood,
        level: RiskLevel::Medium,
        title: "Clean gutters and drains",
        description: "Clear gutters and drainage channels regularly.",
        priority: 3,
    },
    CatalogEntry {
        id: 6,
        hazard: Hazard::Fire,
        level: RiskLevel::High,
        title: "Install a fire alarm system",
        description: "A professional fire alarm and suppression system is urgently needed.",
        priority: 1,
    },
    CatalogEntry {
        id: 7,
        hazard: Hazard::Fire,
        level: RiskLevel::Medium,
        title: "Keep a fire extinguisher",
        description: "Keep extinguishers at home and at work and learn how to use them.",
        priority: 2,
    },
    CatalogEntry {
        id: 8,
        hazard: Hazard::Landslide,
        level: RiskLevel::High,
        title: "Landslide prevention works",
        description: "Start prevention works; a retaining wall or drainage system is required.",
        priority: 1,
    },
    CatalogEntry {
        id: 9,
        hazard: Hazard::Landslide,
        level: RiskLevel::Medium,
        title: "Control surface drainage",
        description: "Check how water runs off the plot and add drainage where needed.",
        priority: 2,
    },
];

/// Catalog entries matching each hazard's own level, sorted by priority
pub fn prioritized(scores: impl IntoIterator<Item = (Hazard, f64)>) -> Vec<Recommendation> {
    let mut recs: Vec<Recommendation> = scores
        .into_iter()
        .flat_map(|(hazard, score)| {
            let level = RiskLevel::from_score(score);
            CATALOG
                .iter()
                .filter(move |e| e.hazard == hazard && e.level == level)
        })
        .map(|e| Recommendation {
            id: e.id,
            hazard: e.hazard,
            level: e.level,
            title: e.title.to_string(),
            description: e.description.to_string(),
            priority: e.priority,
        })
        .collect();

    // Stable sort keeps catalog order within a priority
    recs.sort_by_key(|r| r.priority);
    recs
}

/// Narrative paragraph for a hazard at a given level
pub fn narrative(hazard: Hazard, level: RiskLevel) -> &'static str {
    match (hazard, level) {
        (Hazard::Earthquake, RiskLevel::High) => {
            "The area carries severe earthquake risk. Structural reinforcement should be a priority."
        }
        (Hazard::Earthquake, RiskLevel::Medium) => {
            "Moderate earthquake risk. Preventive measures and a structural check are advised."
        }
        (Hazard::Earthquake, RiskLevel::Low) => "Low earthquake risk. Standard precautions are sufficient.",
        (Hazard::Flood, RiskLevel::High) => {
            "Severe flood risk. Waterproofing and drainage works are needed."
        }
        (Hazard::Flood, RiskLevel::Medium) => "Moderate flood risk. A drainage inspection is advised.",
        (Hazard::Flood, RiskLevel::Low) => "Low flood risk. Standard precautions are sufficient.",
        (Hazard::Fire, RiskLevel::High) => {
            "Severe fire risk. Professional fire safety systems should be installed."
        }
        (Hazard::Fire, RiskLevel::Medium) => {
            "Moderate fire risk. Extinguishers and a smoke alarm are advised."
        }
        (Hazard::Fire, RiskLevel::Low) => "Low fire risk. Basic precautions are sufficient.",
        (Hazard::Landslide, RiskLevel::High) => {
            "Severe landslide risk. A retaining structure and expert survey are needed."
        }
        (Hazard::Landslide, RiskLevel::Medium) => {
            "Moderate landslide risk. A drainage inspection is advised."
        }
        (Hazard::Landslide, RiskLevel::Low) => "Low landslide risk. Standard precautions are sufficient.",
    }
}

pub const PREVENTION_TIPS: &[&str] = &[
    "Keep an emergency bag packed and within reach",
    "Write a family disaster plan and practise it regularly",
    "Keep building insurance current (DASK and fire cover)",
    "Save emergency contact numbers where everyone can find them",
    "Agree a mutual-aid plan with your neighbours",
    "Have the building inspected regularly and keep up with maintenance",
    "Follow local authority disaster warnings",
    "Take first-aid training and keep basic equipment at home",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_advice_tiers() {
        assert_eq!(general_advice(RiskLevel::High).len(), 3);
        assert_eq!(general_advice(RiskLevel::Medium).len(), 2);
        assert_eq!(general_advice(RiskLevel::Low).len(), 1);
    }

    #[test]
    fn test_prioritized_sorted_by_priority() {
        let recs = prioritized([
            (Hazard::Earthquake, 85.0),
            (Hazard::Flood, 45.0),
            (Hazard::Fire, 10.0),
            (Hazard::Landslide, 55.0),
        ]);

        // earthquake high (1, 2), flood medium (3), landslide medium (9)
        let ids: Vec<u32> = recs.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 9, 5]);
        assert!(recs.windows(2).all(|w| w[0].priority <= w[1].priority));
    }

    #[test]
    fn test_low_scores_have_no_catalog_entries() {
        let recs = prioritized(Hazard::ALL.into_iter().map(|h| (h, 5.0)));
        assert!(recs.is_empty());
    }
}
