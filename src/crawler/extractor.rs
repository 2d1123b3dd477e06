//! Anchor-based entity extraction
//!
//! Extraction walks a fetched document by locating named structural markers
//! (the entity-name header, the info list, the lineup table, the related
//! list) rather than fixed coordinates, and reads content relative to each
//! anchor. A missing required anchor makes the one document unusable; a
//! missing optional field degrades to `None`.
//!
//! Parsing is fully synchronous: `scraper::Html` is not `Send`, so it never
//! crosses an await point. Sub-entities discovered inline are returned as
//! pending stubs for the worker to resolve within the same unit of work.

use crate::model::{
    parse_role_spans, EntityKind, EntityRecord, EntityStub, RelationDescriptor, RelationStatus,
};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Extraction failure for one document
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A required structural anchor is absent; the document is unusable
    #[error("Required anchor missing: {0}")]
    MissingAnchor(&'static str),

    /// The reference does not name a known entity kind
    #[error("Unknown entity kind for reference: {0}")]
    UnknownKind(String),
}

/// Result of extracting one document
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: EntityRecord,
    pub relations: Vec<RelationDescriptor>,

    /// Sub-entities referenced inline, not yet fetched. The worker resolves
    /// these within the same unit of work; whatever stays unresolved is
    /// recorded on the committed record as a stub.
    pub pending_stubs: Vec<EntityStub>,
}

/// Extracts a normalized entity record from a fetched document body.
pub fn extract_entity(body: &str, reference: &str) -> Result<Extraction, ExtractError> {
    let kind = EntityKind::from_reference(reference)
        .ok_or_else(|| ExtractError::UnknownKind(reference.to_string()))?;

    let document = Html::parse_document(body);

    // The primary name header is the one hard requirement
    let name = extract_name(&document).ok_or(ExtractError::MissingAnchor("entity-name"))?;

    let mut record = EntityRecord::new(kind, reference, &name);
    apply_info_fields(&document, &mut record);

    let mut relations = Vec::new();
    let mut pending_stubs = Vec::new();

    extract_lineup(&document, kind, reference, &mut relations, &mut pending_stubs);
    extract_related(&document, reference, &mut relations, &mut pending_stubs);

    Ok(Extraction {
        record,
        relations,
        pending_stubs,
    })
}

/// Reads the required `h1.entity-name` anchor.
fn extract_name(document: &Html) -> Option<String> {
    let selector = Selector::parse("h1.entity-name").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Reads the `#entity-info` definition list into the record's detail fields.
///
/// Fields the archive marks "N/A" or "Unknown" degrade to `None` rather
/// than carrying the placeholder text forward.
fn apply_info_fields(document: &Html, record: &mut EntityRecord) {
    let (Ok(dt_sel), Ok(dd_sel)) = (
        Selector::parse("#entity-info dt"),
        Selector::parse("#entity-info dd"),
    ) else {
        return;
    };

    let labels = document.select(&dt_sel);
    let values = document.select(&dd_sel);

    for (label_el, value_el) in labels.zip(values) {
        let label = label_el.text().collect::<String>().trim().to_lowercase();
        let value = value_el.text().collect::<String>().trim().to_string();

        let value = match value.as_str() {
            "" | "N/A" | "Unknown" | "unknown" => None,
            _ => Some(value),
        };

        match label.as_str() {
            "country" => record.country = value,
            "genre" => record.genre = value,
            "formed" | "formed in" => {
                record.formed_year = value.as_deref().and_then(parse_year_field)
            }
            "real name" => record.real_name = value,
            "birthplace" | "origin" => record.birthplace = value,
            "year" | "release year" => {
                record.release_year = value.as_deref().and_then(parse_year_field)
            }
            "label" => record.label_name = value,
            other => {
                tracing::debug!("Ignoring unrecognized info field: {:?}", other);
            }
        }
    }
}

fn parse_year_field(value: &str) -> Option<u16> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

/// Reads the `#lineup` table into relation descriptors.
///
/// On a band page each row names an artist; on an artist page each row names
/// a band. The relation subject is always the artist side so the stored
/// direction does not depend on which page produced it.
fn extract_lineup(
    document: &Html,
    page_kind: EntityKind,
    page_ref: &str,
    relations: &mut Vec<RelationDescriptor>,
    pending_stubs: &mut Vec<EntityStub>,
) {
    let (Ok(row_sel), Ok(link_sel), Ok(role_sel)) = (
        Selector::parse("table#lineup tr"),
        Selector::parse("a[href]"),
        Selector::parse("td.role"),
    ) else {
        return;
    };

    for row in document.select(&row_sel) {
        let status = row
            .value()
            .attr("class")
            .map(RelationStatus::from_section_class)
            .unwrap_or(RelationStatus::Unknown);

        let Some(link) = row.select(&link_sel).next() else {
            continue;
        };
        let Some((linked_ref, linked_name)) = linked_entity(link) else {
            continue;
        };

        let Some(linked_kind) = EntityKind::from_reference(&linked_ref) else {
            tracing::debug!("Skipping lineup link with unknown kind: {}", linked_ref);
            continue;
        };

        let (subject_ref, object_ref) = match page_kind {
            EntityKind::Artist => (page_ref.to_string(), linked_ref.clone()),
            _ => (linked_ref.clone(), page_ref.to_string()),
        };

        let role_text = row
            .select(&role_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let parsed = parse_role_spans(&role_text);
        if parsed.is_empty() {
            // Row with no usable role text still carries the relationship
            relations.push(RelationDescriptor {
                subject_ref,
                object_ref,
                role: "Member".to_string(),
                status,
                spans: Vec::new(),
            });
        } else {
            for role_spans in parsed {
                relations.push(RelationDescriptor {
                    subject_ref: subject_ref.clone(),
                    object_ref: object_ref.clone(),
                    role: role_spans.role,
                    status,
                    spans: role_spans.spans,
                });
            }
        }

        pending_stubs.push(EntityStub {
            kind: linked_kind,
            reference: linked_ref,
            name: linked_name,
        });
    }
}

/// Reads the `ul#related` list into relations and stubs.
fn extract_related(
    document: &Html,
    page_ref: &str,
    relations: &mut Vec<RelationDescriptor>,
    pending_stubs: &mut Vec<EntityStub>,
) {
    let Ok(link_sel) = Selector::parse("ul#related li a[href]") else {
        return;
    };

    for link in document.select(&link_sel) {
        let Some((linked_ref, linked_name)) = linked_entity(link) else {
            continue;
        };
        let Some(linked_kind) = EntityKind::from_reference(&linked_ref) else {
            tracing::debug!("Skipping related link with unknown kind: {}", linked_ref);
            continue;
        };

        let role = link
            .value()
            .attr("data-role")
            .map(str::to_string)
            .unwrap_or_else(|| "Related".to_string());

        relations.push(RelationDescriptor {
            subject_ref: page_ref.to_string(),
            object_ref: linked_ref.clone(),
            role,
            status: RelationStatus::Unknown,
            spans: Vec::new(),
        });

        pending_stubs.push(EntityStub {
            kind: linked_kind,
            reference: linked_ref,
            name: linked_name,
        });
    }
}

/// Turns a link element into a (reference, display name) pair.
fn linked_entity(link: ElementRef<'_>) -> Option<(String, String)> {
    let href = link.value().attr("href")?.trim();
    let reference = reference_from_href(href)?;
    let name = link.text().collect::<String>().trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some((reference, name))
}

/// Normalizes a href into a site-relative reference.
fn reference_from_href(href: &str) -> Option<String> {
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let path = if let Some(rest) = href.split_once("://").map(|(_, r)| r) {
        // Absolute URL: drop the host, keep the path
        rest.split_once('/').map(|(_, p)| p)?
    } else {
        href.trim_start_matches('/')
    };

    let path = path.trim_start_matches('/').trim_end_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}
