//! Node/edge derivation for the people and organization networks.

use crate::model::color_grade::ColorGrade;
use crate::model::organization::Organization;
use crate::model::person::Person;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

const PERSON_LABEL_MAX: usize = 10;
const PERSON_LABEL_TRUNCATED: usize = 9;
const ORG_LABEL_MAX: usize = 15;
const ORG_LABEL_TRUNCATED: usize = 12;
const PERSON_NODE_SIZE: u32 = 28;
const ORG_NODE_SIZE: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    People,
    Organizations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    /// `person-<id>` or `org-<id>`.
    pub id: String,
    pub label: String,
    /// Hover text.
    pub title: String,
    pub image: Option<String>,
    pub border_color: &'static str,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkGraph {
    pub kind: NetworkKind,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

pub fn person_node_id(id: &str) -> String {
    format!("person-{id}")
}

pub fn organization_node_id(id: &str) -> String {
    format!("org-{id}")
}

/// People linked whenever they share an organization.
///
/// Unresolved memberships (empty organization id) never create edges.
pub fn build_people_network(people: &[Person]) -> NetworkGraph {
    let nodes = people.iter().map(person_node).collect();

    let mut members_by_org: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for person in people {
        let organization_ids = person
            .organization_memberships
            .iter()
            .filter(|membership| membership.is_resolved())
            .map(|membership| membership.organization_id.as_str())
            .collect::<BTreeSet<_>>();
        for organization_id in organization_ids {
            members_by_org
                .entry(organization_id)
                .or_default()
                .push(person_node_id(&person.id));
        }
    }

    NetworkGraph {
        kind: NetworkKind::People,
        nodes,
        edges: pairwise_edges("p", members_by_org.values()),
    }
}

/// Organizations linked whenever one person belongs to both.
///
/// Memberships pointing at organizations outside `organizations` are ignored.
pub fn build_organization_network(
    organizations: &[Organization],
    people: &[Person],
) -> NetworkGraph {
    let nodes = organizations.iter().map(organization_node).collect();
    let known = organizations
        .iter()
        .map(|organization| organization.id.as_str())
        .collect::<HashSet<_>>();

    let groups = people
        .iter()
        .map(|person| {
            person
                .organization_memberships
                .iter()
                .filter(|membership| known.contains(membership.organization_id.as_str()))
                .map(|membership| organization_node_id(&membership.organization_id))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    NetworkGraph {
        kind: NetworkKind::Organizations,
        nodes,
        edges: pairwise_edges("o", groups.iter()),
    }
}

/// Connects every pair inside each group once, with endpoint-sorted ids.
fn pairwise_edges<'a>(
    prefix: &str,
    groups: impl Iterator<Item = &'a Vec<String>>,
) -> Vec<GraphEdge> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for group in groups {
        for (index, first) in group.iter().enumerate() {
            for second in &group[index + 1..] {
                if first == second {
                    continue;
                }
                let (low, high) = if first <= second {
                    (first, second)
                } else {
                    (second, first)
                };
                let id = format!("{prefix}-{low}-{high}");
                if seen.insert(id.clone()) {
                    edges.push(GraphEdge {
                        id,
                        from: first.clone(),
                        to: second.clone(),
                    });
                }
            }
        }
    }
    edges
}

fn person_node(person: &Person) -> GraphNode {
    let first_name = person.name.split_whitespace().next().unwrap_or("");
    let label = if first_name.is_empty() {
        "Person".to_string()
    } else {
        truncate_label(first_name, PERSON_LABEL_MAX, PERSON_LABEL_TRUNCATED, "")
    };
    GraphNode {
        id: person_node_id(&person.id),
        label,
        title: node_title(
            &person.name,
            person.color_grade,
            &person.overall_title,
            "No Title",
        ),
        image: non_empty(&person.photo_url),
        border_color: person.color_grade.hex(),
        size: PERSON_NODE_SIZE,
    }
}

fn organization_node(organization: &Organization) -> GraphNode {
    let label = if organization.name.is_empty() {
        "Organization".to_string()
    } else {
        truncate_label(&organization.name, ORG_LABEL_MAX, ORG_LABEL_TRUNCATED, "...")
    };
    GraphNode {
        id: organization_node_id(&organization.id),
        label,
        title: node_title(
            &organization.name,
            organization.color_grade,
            &organization.website,
            "No Website",
        ),
        image: non_empty(&organization.logo_url),
        border_color: organization.color_grade.hex(),
        size: ORG_NODE_SIZE,
    }
}

fn node_title(name: &str, grade: ColorGrade, detail: &str, missing_detail: &str) -> String {
    let name = if name.is_empty() { "N/A" } else { name };
    let detail = if detail.is_empty() { missing_detail } else { detail };
    format!("{name} ({})\n{detail}", grade.label())
}

fn truncate_label(value: &str, max: usize, keep: usize, suffix: &str) -> String {
    if value.chars().count() > max {
        let mut truncated = value.chars().take(keep).collect::<String>();
        truncated.push_str(suffix);
        truncated
    } else {
        value.to_string()
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
